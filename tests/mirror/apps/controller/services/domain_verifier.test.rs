// [tests/mirror/apps/controller/services/domain_verifier.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL VERIFICADOR DE DOMINIOS (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL DESAFÍO TXT Y LA MÁQUINA DE ESTADOS
 * =================================================================
 */

use async_trait::async_trait;
use helmsman_controller::adapters::{
    DetachedAcme, DetachedDocker, DetachedProxy, DnsAdapter, SystemClock,
};
use helmsman_controller::services::domain_verifier::{begin_verification, complete_verification};
use helmsman_controller::state::{AppState, Collaborators};
use helmsman_core_vault as vault;
use helmsman_domain_models::{DomainStatus, VerificationMethod, VerificationStatus};
use helmsman_infra_db::StoreError;
use std::sync::{Arc, Mutex};

/// Doble DNS que registra cada registro TXT plantado y eliminado.
struct RecordingDns {
    planted: Mutex<Vec<(String, String)>>,
    removed: Mutex<Vec<(String, String)>>,
}

impl RecordingDns {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            planted: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DnsAdapter for RecordingDns {
    async fn ensure_txt(
        &self,
        fqdn: &str,
        value: &str,
        _ttl_seconds: u32,
    ) -> Result<(), StoreError> {
        self.planted
            .lock()
            .expect("recording lock")
            .push((fqdn.to_string(), value.to_string()));
        Ok(())
    }

    async fn delete_txt(&self, fqdn: &str, value: &str) -> Result<(), StoreError> {
        self.removed
            .lock()
            .expect("recording lock")
            .push((fqdn.to_string(), value.to_string()));
        Ok(())
    }
}

async fn ignite(tag: &str, dns: Arc<RecordingDns>) -> Arc<AppState> {
    vault::install_master_key([7u8; 32]);
    let collaborators = Collaborators {
        docker: Arc::new(DetachedDocker),
        proxy: Arc::new(DetachedProxy),
        acme: Arc::new(DetachedAcme),
        dns,
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
async fn certify_txt_challenge_lifecycle() {
    let dns = RecordingDns::new();
    let state = ignite("mem_verifier_txt", dns.clone()).await;

    let domain = state
        .domains
        .create("foo.test", None, None)
        .await
        .expect("domain genesis");

    // Apertura del desafío: tentativa pendiente + dominio 'verifying'.
    let attempt = begin_verification(&state, domain.id, VerificationMethod::TXT)
        .await
        .expect("challenge opened");
    assert_eq!(attempt.status, VerificationStatus::Pending);
    assert_eq!(
        attempt.challenge,
        format!("helmsman-verify={}", domain.verification_token)
    );
    assert_eq!(
        state.domains.get(domain.id).await.expect("reread").status,
        DomainStatus::Verifying
    );

    // El colaborador plantó el TXT bajo el FQDN de desafío.
    {
        let planted = dns.planted.lock().expect("recording lock");
        assert_eq!(planted.len(), 1);
        assert_eq!(planted[0].0, "_helmsman-challenge.foo.test");
        assert_eq!(planted[0].1, attempt.challenge);
    }

    // Veredicto positivo: dominio verificado y desafío retirado.
    complete_verification(&state, attempt.id, true)
        .await
        .expect("verdict sealed");

    assert_eq!(
        state.domains.get(domain.id).await.expect("reread").status,
        DomainStatus::Verified
    );
    assert_eq!(dns.removed.lock().expect("recording lock").len(), 1);
}

#[tokio::test]
async fn certify_negative_verdict_degrades_to_error() {
    let dns = RecordingDns::new();
    let state = ignite("mem_verifier_negative", dns).await;

    let domain = state
        .domains
        .create("bar.test", None, None)
        .await
        .expect("domain genesis");
    let attempt = begin_verification(&state, domain.id, VerificationMethod::CNAME)
        .await
        .expect("challenge opened");

    complete_verification(&state, attempt.id, false)
        .await
        .expect("verdict sealed");

    assert_eq!(
        state.domains.get(domain.id).await.expect("reread").status,
        DomainStatus::Error
    );
    let resolved_attempt = state
        .domains
        .get_verification(attempt.id)
        .await
        .expect("attempt reread");
    assert_eq!(resolved_attempt.status, VerificationStatus::Failed);
}
