// [tests/mirror/apps/controller/services/cert_manager.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL GESTOR DE CERTIFICADOS (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE EMISIÓN ACME Y BARRIDO DE RENOVACIÓN
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{Duration, Utc};
use helmsman_controller::adapters::{
    AcmeAdapter, DetachedDns, DetachedDocker, DetachedProxy, SystemClock,
};
use helmsman_controller::services::cert_manager::{issue_certificate, sweep_once, upload_certificate};
use helmsman_controller::state::{AppState, Collaborators};
use helmsman_core_vault as vault;
use helmsman_domain_models::{CertificateStatus, CertificateType};
use helmsman_infra_db::repositories::certificate::IssuedMaterial;
use helmsman_infra_db::StoreError;
use std::sync::Arc;

/// Doble ACME que emite material con ventana de validez futura.
struct FakeAcme;

fn issued(domain: &str) -> IssuedMaterial {
    IssuedMaterial {
        cert_pem: format!("CERT[{}]", domain),
        chain_pem: Some("CHAIN".into()),
        key_pem: format!("KEY[{}]", domain),
        issuer: "Helmsman Test CA".into(),
        not_before: Utc::now() - Duration::hours(1),
        not_after: Utc::now() + Duration::days(90),
    }
}

#[async_trait]
impl AcmeAdapter for FakeAcme {
    async fn issue(&self, domain: &str) -> Result<IssuedMaterial, StoreError> {
        Ok(issued(domain))
    }

    async fn renew(&self, domain: &str) -> Result<IssuedMaterial, StoreError> {
        Ok(issued(domain))
    }
}

async fn ignite(tag: &str) -> Arc<AppState> {
    vault::install_master_key([7u8; 32]);
    let collaborators = Collaborators {
        docker: Arc::new(DetachedDocker),
        proxy: Arc::new(DetachedProxy),
        acme: Arc::new(FakeAcme),
        dns: Arc::new(DetachedDns),
        clock: Arc::new(SystemClock),
    };
    let (state, _index_queue) = AppState::assemble(
        &format!("file:{}?mode=memory&cache=shared", tag),
        collaborators,
    )
    .await
    .expect("CRITICAL_FAULT: nexus assembly failed");
    state
}

#[tokio::test]
async fn certify_acme_issue_seals_enhanced_shape() {
    let state = ignite("mem_certmgr_issue").await;

    // Dominio preexistente: la emisión lo asocia al material nuevo.
    let domain = state
        .domains
        .create("example.com", None, None)
        .await
        .expect("domain genesis");

    let sealed = issue_certificate(&state, "example.com")
        .await
        .expect("issuance sealed");

    assert_eq!(sealed.cert_type, CertificateType::Acme);
    assert_eq!(sealed.status, CertificateStatus::Active);
    assert_eq!(sealed.issuer.as_deref(), Some("Helmsman Test CA"));
    assert!(sealed.not_before.is_some());
    assert!(sealed.not_after.is_some());
    assert_eq!(sealed.pem_chain.as_deref(), Some("CHAIN"));
    assert!(sealed.auto_renew);

    // La llave viaja descifrada solo en memoria.
    assert_eq!(sealed.key_data.as_deref(), Some("KEY[example.com]"));

    let attached = state.domains.get(domain.id).await.expect("domain reread");
    assert_eq!(attached.certificate_id, Some(sealed.id));
}

#[tokio::test]
async fn certify_upload_path_and_active_lookup() {
    let state = ignite("mem_certmgr_upload").await;

    upload_certificate(&state, "edge.test", "CERT_PEM", "KEY_PEM", None)
        .await
        .expect("upload sealed");

    let active = state
        .certificates
        .get_by_domain("edge.test")
        .await
        .expect("active lookup");
    assert_eq!(active.cert_type, CertificateType::Uploaded);
    assert_eq!(active.key_data.as_deref(), Some("KEY_PEM"));
}

#[tokio::test]
async fn certify_renewal_sweep_rotates_expired_material() {
    let state = ignite("mem_certmgr_sweep").await;

    // Material ACME ya vencido con auto-renovación.
    let stale = state
        .certificates
        .create_acme(
            "stale.test",
            IssuedMaterial {
                cert_pem: "OLD_CERT".into(),
                chain_pem: None,
                key_pem: "OLD_KEY".into(),
                issuer: "Helmsman Test CA".into(),
                not_before: Utc::now() - Duration::days(120),
                not_after: Utc::now() - Duration::days(1),
            },
        )
        .await
        .expect("stale seal");

    sweep_once(&state).await;

    // La fila previa degradó y una nueva fila activa tomó el relevo.
    let superseded = state.certificates.get(stale.id).await.expect("stale reread");
    assert_eq!(superseded.status, CertificateStatus::Expired);

    let renewed = state
        .certificates
        .get_by_domain("stale.test")
        .await
        .expect("renewed lookup");
    assert_ne!(renewed.id, stale.id);
    assert_eq!(renewed.status, CertificateStatus::Active);
    assert!(renewed.not_after.expect("validity window") > Utc::now());

    let evidence = state.audit.list(None).await.expect("audit sweep");
    assert!(evidence
        .iter()
        .any(|entry| entry.action == "certificate.renewed"));
}
