// [apps/controller/src/services/cert_manager.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICATE MANAGER (V5.1 - RENEWAL SWEEP)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: ALTAS, EMISIÓN ACME Y BARRIDO DE VENCIMIENTO (C6)
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. UPLOAD PATH: PEM del operador -> llave cifrada -> fila activa.
 * 2. ACME PATH: El colaborador entrega (cert, chain, key, issuer,
 *    ventana); el núcleo cifra y sella la forma enriquecida.
 * 3. RENEWAL SWEEP: Vencidos con auto-renovación renacen como fila
 *    nueva; la previa queda 'expired'. Sin auto-renovación solo degradan.
 * =================================================================
 */

use crate::state::AppState;
use chrono::DateTime;
use chrono::Utc;
use helmsman_domain_models::Certificate;
use helmsman_infra_db::StoreError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};

/// Alta de un certificado subido por el operador.
pub async fn upload_certificate(
    application_state: &AppState,
    domain: &str,
    cert_pem: &str,
    key_pem: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Certificate, StoreError> {
    let sealed = application_state
        .certificates
        .create_uploaded(domain, cert_pem, key_pem, expires_at)
        .await?;

    application_state
        .record_audit(
            "cert-manager",
            "certificate.uploaded",
            "certificate",
            &sealed.id.to_string(),
            serde_json::json!({ "domain": domain }),
        )
        .await;
    Ok(sealed)
}

/**
 * Emisión ACME: consume al colaborador y persiste la forma enriquecida.
 * El dominio, si existe en el Ledger, queda asociado al material nuevo.
 */
pub async fn issue_certificate(
    application_state: &AppState,
    domain: &str,
) -> Result<Certificate, StoreError> {
    let issued_material = application_state.acme.issue(domain).await?;
    let sealed = application_state
        .certificates
        .create_acme(domain, issued_material)
        .await?;

    if let Ok(owned_domain) = application_state.domains.get_by_name(domain).await {
        application_state
            .domains
            .attach_certificate(owned_domain.id, Some(sealed.id))
            .await?;
    }

    application_state
        .record_audit(
            "cert-manager",
            "certificate.issued",
            "certificate",
            &sealed.id.to_string(),
            serde_json::json!({ "domain": domain, "issuer": sealed.issuer }),
        )
        .await;
    Ok(sealed)
}

/// Certificado activo más reciente de un dominio, llave en memoria.
pub async fn active_certificate_for(
    application_state: &AppState,
    domain: &str,
) -> Result<Certificate, StoreError> {
    application_state.certificates.get_by_domain(domain).await
}

/// Lanza el daemon de barrido de vencimiento/renovación.
pub fn spawn_expiry_sweep(
    application_state: Arc<AppState>,
    mut shutdown_signal: watch::Receiver<bool>,
    tick_period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sweep_ticker = interval(tick_period);
        info!("🔐 [CERT_SWEEP_ACTIVE]: Expiry & renewal daemon initiated.");

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    info!("🔐 [CERT_SWEEP_HALT]: Shutdown signal honored.");
                    break;
                }
                _ = sweep_ticker.tick() => {
                    sweep_once(&application_state).await;
                }
            }
        }
    })
}

/// Una pasada del barrido: degradación + renovación vía colaborador.
pub async fn sweep_once(application_state: &AppState) {
    let now = application_state.clock.now();

    // 1. DEGRADACIÓN EN BLOQUE DE VENCIDOS SIN AUTO-RENOVACIÓN
    if let Err(degrade_fault) = application_state.certificates.mark_all_expired(now).await {
        warn!("🔐 [SWEEP_DEGRADE_FAULT]: {}", degrade_fault);
    }

    // 2. RENOVACIÓN DE VENCIDOS CON AUTO-RENOVACIÓN
    let renewal_candidates = match application_state.certificates.list_for_renewal(now).await {
        Ok(candidates) => candidates,
        Err(list_fault) => {
            warn!("🔐 [SWEEP_LIST_FAULT]: {}", list_fault);
            return;
        }
    };

    for stale_certificate in renewal_candidates {
        match application_state.acme.renew(&stale_certificate.domain).await {
            Ok(renewed_material) => {
                let renewal_outcome = async {
                    let renewed = application_state
                        .certificates
                        .create_acme(&stale_certificate.domain, renewed_material)
                        .await?;
                    application_state
                        .certificates
                        .mark_expired(stale_certificate.id)
                        .await?;
                    Ok::<i64, StoreError>(renewed.id)
                }
                .await;

                match renewal_outcome {
                    Ok(renewed_id) => {
                        application_state
                            .record_audit(
                                "cert-manager",
                                "certificate.renewed",
                                "certificate",
                                &renewed_id.to_string(),
                                serde_json::json!({
                                    "domain": stale_certificate.domain,
                                    "superseded": stale_certificate.id
                                }),
                            )
                            .await;
                    }
                    Err(persist_fault) => {
                        warn!("🔐 [RENEWAL_PERSIST_FAULT]: {}", persist_fault);
                    }
                }
            }
            Err(collaborator_fault) => {
                // El reconciliador reintenta en el próximo tick del barrido.
                warn!(
                    "🔐 [RENEWAL_DEGRADED]: Domain '{}' deferred: {}",
                    stale_certificate.domain, collaborator_fault
                );
            }
        }
    }
}
