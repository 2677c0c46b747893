// [apps/controller/src/services/domain_verifier.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN VERIFIER (V4.0 - OWNERSHIP CHALLENGES)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: ORQUESTACIÓN DE DESAFÍOS DE PROPIEDAD (C7)
 *
 * Los colaboradores DNS/HTTP ejecutan el chequeo real; el núcleo
 * gestiona la máquina de estados del dominio y el ciclo de la tentativa.
 * =================================================================
 */

use crate::state::AppState;
use helmsman_domain_models::{DomainVerification, VerificationMethod};
use helmsman_infra_db::StoreError;
use tracing::{info, warn};

/// FQDN del registro TXT de desafío para un dominio.
fn challenge_fqdn(domain_name: &str) -> String {
    format!("_helmsman-challenge.{}", domain_name)
}

/**
 * Abre una tentativa de verificación: sella la fila (estado verifying) y,
 * para el método TXT, pide al colaborador DNS plantar el desafío.
 *
 * Un fallo del colaborador no aborta la tentativa: queda pendiente y el
 * chequeo externo la resolverá o el operador la reintentará.
 */
pub async fn begin_verification(
    application_state: &AppState,
    domain_id: i64,
    method: VerificationMethod,
) -> Result<DomainVerification, StoreError> {
    let domain = application_state.domains.get(domain_id).await?;
    let challenge = format!("helmsman-verify={}", domain.verification_token);

    let attempt = application_state
        .domains
        .create_verification(domain_id, method, &challenge)
        .await?;

    if method == VerificationMethod::TXT {
        if let Err(dns_fault) = application_state
            .dns
            .ensure_txt(&challenge_fqdn(&domain.name), &challenge, 300)
            .await
        {
            warn!(
                "🌍 [CHALLENGE_DEGRADED]: TXT planting for '{}' deferred: {}",
                domain.name, dns_fault
            );
        }
    }

    application_state
        .record_audit(
            "domain-verifier",
            "domain.verification_started",
            "domain",
            &domain_id.to_string(),
            serde_json::json!({ "method": method.as_str() }),
        )
        .await;
    Ok(attempt)
}

/**
 * Sella el veredicto reportado por el colaborador externo y limpia el
 * desafío TXT plantado (mejor esfuerzo).
 */
pub async fn complete_verification(
    application_state: &AppState,
    verification_id: i64,
    verified: bool,
) -> Result<(), StoreError> {
    let attempt = application_state
        .domains
        .get_verification(verification_id)
        .await?;
    let domain = application_state.domains.get(attempt.domain_id).await?;

    let checked_at = application_state.clock.now();
    application_state
        .domains
        .complete_verification(verification_id, verified, checked_at)
        .await?;

    if attempt.method == VerificationMethod::TXT {
        if let Err(dns_fault) = application_state
            .dns
            .delete_txt(&challenge_fqdn(&domain.name), &attempt.challenge)
            .await
        {
            warn!("🌍 [CHALLENGE_CLEANUP_DEGRADED]: {}", dns_fault);
        }
    }

    info!(
        "🌍 [VERIFICATION_VERDICT]: Domain '{}' -> {}.",
        domain.name,
        if verified { "verified" } else { "error" }
    );

    application_state
        .record_audit(
            "domain-verifier",
            "domain.verification_completed",
            "domain",
            &attempt.domain_id.to_string(),
            serde_json::json!({ "verified": verified }),
        )
        .await;
    Ok(())
}
