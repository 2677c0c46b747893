// [tests/mirror/libs/infra/db_libsql/domain_state_machine.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE LA MÁQUINA DE DOMINIOS (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE TRANSICIONES GUARDADAS Y TENTATIVAS
 * =================================================================
 */

use chrono::Utc;
use helmsman_domain_models::{DomainStatus, VerificationMethod, VerificationStatus};
use helmsman_infra_db::repositories::DomainRepository;
use helmsman_infra_db::{DbClient, StoreError};

async fn proving_ground(tag: &str) -> DomainRepository {
    let database_client = DbClient::connect(&format!("file:{}?mode=memory&cache=shared", tag))
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    DomainRepository::new(database_client)
}

#[tokio::test]
async fn certify_guarded_transitions_scenario() {
    let domains = proving_ground("mem_domain_fsm").await;

    // Génesis: estado pending y token de 32 hex.
    let sealed = domains
        .create("foo.test", None, None)
        .await
        .expect("domain genesis");
    assert_eq!(sealed.status, DomainStatus::Pending);
    assert_eq!(sealed.verification_token.len(), 32);
    assert!(sealed
        .verification_token
        .bytes()
        .all(|b| b.is_ascii_hexdigit()));

    // Literal fuera del catálogo: rechazo sin mutación.
    assert!(matches!(
        domains.update_status(sealed.id, "bogus").await,
        Err(StoreError::Validation(_))
    ));
    assert_eq!(
        domains.get(sealed.id).await.expect("reread").status,
        DomainStatus::Pending
    );

    // Transición legal.
    let verified = domains
        .update_status(sealed.id, "verified")
        .await
        .expect("legal transition");
    assert_eq!(verified.status, DomainStatus::Verified);

    // Re-aplicación idempotente del mismo valor.
    let repeated = domains
        .update_status(sealed.id, "verified")
        .await
        .expect("idempotent transition");
    assert_eq!(repeated.status, DomainStatus::Verified);
}

#[tokio::test]
async fn certify_verification_attempt_lifecycle() {
    let domains = proving_ground("mem_domain_attempts").await;

    let sealed = domains
        .create("bar.test", Some("route53".into()), None)
        .await
        .expect("domain genesis");

    // La tentativa abre y el dominio transiciona a 'verifying'.
    let attempt = domains
        .create_verification(sealed.id, VerificationMethod::TXT, "helmsman-verify=abc")
        .await
        .expect("attempt genesis");
    assert_eq!(attempt.status, VerificationStatus::Pending);
    assert_eq!(attempt.method, VerificationMethod::TXT);
    assert_eq!(
        domains.get(sealed.id).await.expect("reread").status,
        DomainStatus::Verifying
    );

    // Veredicto positivo: tentativa y dominio sellan juntos.
    domains
        .complete_verification(attempt.id, true, Utc::now())
        .await
        .expect("verdict seal");

    let resolved_attempt = domains
        .get_verification(attempt.id)
        .await
        .expect("attempt reread");
    assert_eq!(resolved_attempt.status, VerificationStatus::Verified);
    assert!(resolved_attempt.checked_at.is_some());

    let resolved_domain = domains.get(sealed.id).await.expect("domain reread");
    assert_eq!(resolved_domain.status, DomainStatus::Verified);
    assert!(resolved_domain.verification_checked_at.is_some());
}

#[tokio::test]
async fn certify_failed_attempt_degrades_to_error() {
    let domains = proving_ground("mem_domain_failure").await;

    let sealed = domains
        .create("baz.test", None, None)
        .await
        .expect("domain genesis");
    let attempt = domains
        .create_verification(sealed.id, VerificationMethod::CNAME, "challenge")
        .await
        .expect("attempt genesis");

    domains
        .complete_verification(attempt.id, false, Utc::now())
        .await
        .expect("verdict seal");

    assert_eq!(
        domains.get(sealed.id).await.expect("reread").status,
        DomainStatus::Error
    );
}
