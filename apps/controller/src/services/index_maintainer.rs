// [apps/controller/src/services/index_maintainer.rs]
/*!
 * =================================================================
 * APARATO: INDEX MAINTAINER DAEMON (V4.2 - EVENTUAL COHERENCE)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: CONSUMO DE LA COLA POST-COMMIT Y REPARACIÓN TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. INCREMENTAL FIRST: Cada trabajo re-deriva una sola entidad; el
 *    índice converge sin bloquear las mutaciones canónicas.
 * 2. OVERFLOW REPAIR: El desborde de la cola degrada a una solicitud de
 *    reindexación completa, drenada en el tick periódico.
 * 3. CRASH REPAIR: Un reindex al arranque repara cualquier señal
 *    perdida por un colapso previo al despacho post-commit.
 * =================================================================
 */

use crate::state::AppState;
use helmsman_infra_db::IndexJob;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Lanza el daemon de mantenimiento del índice.
pub fn spawn_index_maintainer(
    application_state: Arc<AppState>,
    mut index_queue: mpsc::Receiver<IndexJob>,
    mut shutdown_signal: watch::Receiver<bool>,
    repair_period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut repair_ticker = interval(repair_period);
        info!("🔎 [INDEX_MAINTAINER_ACTIVE]: Post-commit queue attached.");

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    info!("🔎 [INDEX_MAINTAINER_HALT]: Shutdown signal honored.");
                    break;
                }
                delivered = index_queue.recv() => {
                    match delivered {
                        Some(job) => consume_job(&application_state, job).await,
                        None => {
                            warn!("🔎 [INDEX_QUEUE_CLOSED]: Bridge dropped; daemon retiring.");
                            break;
                        }
                    }
                }
                _ = repair_ticker.tick() => {
                    if application_state.bridge.take_reindex_request() {
                        run_full_repair(&application_state).await;
                    }
                }
            }
        }
    })
}

/// Consume un trabajo incremental de la cola post-commit.
pub async fn consume_job(application_state: &AppState, job: IndexJob) {
    let outcome = match job {
        IndexJob::Upsert {
            entity_type,
            entity_id,
        } => {
            debug!("🔎 [INDEX_UPSERT]: {} #{}", entity_type.as_str(), entity_id);
            application_state
                .search
                .refresh_entity(entity_type, entity_id)
                .await
        }
        IndexJob::Delete {
            entity_type,
            entity_id,
        } => {
            debug!("🔎 [INDEX_DELETE]: {} #{}", entity_type.as_str(), entity_id);
            application_state
                .search
                .delete_by_entity(entity_type, entity_id)
                .await
        }
    };

    if let Err(index_fault) = outcome {
        // Best-effort: la reparación completa restituirá la coherencia.
        warn!("🔎 [INDEX_JOB_DEGRADED]: {}", index_fault);
        application_state.bridge.request_reindex();
    }
}

/// Reconstrucción completa con degradación silenciosa ante fallo.
pub async fn run_full_repair(application_state: &AppState) {
    match application_state.search.reindex().await {
        Ok(projected_rows) => {
            info!("🔎 [INDEX_REPAIRED]: {} documents projected.", projected_rows);
        }
        Err(reindex_fault) => {
            warn!("🔎 [INDEX_REPAIR_FAULT]: {}", reindex_fault);
        }
    }
}
