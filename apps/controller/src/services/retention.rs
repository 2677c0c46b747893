// [apps/controller/src/services/retention.rs]
/*!
 * =================================================================
 * APARATO: RETENTION DAEMON (V3.0 - HYGIENE SWEEP)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: PURGA DE MÉTRICAS, ESTADOS OAUTH Y SNAPSHOTS FRÍOS
 * =================================================================
 */

use crate::state::AppState;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};

/// Snapshots inactivos conservados como historial.
const SNAPSHOT_HISTORY_KEPT: i64 = 20;

/// Lanza el daemon de higiene con el período y horizonte indicados.
pub fn spawn_retention(
    application_state: Arc<AppState>,
    mut shutdown_signal: watch::Receiver<bool>,
    tick_period: Duration,
    metrics_retention_days: i64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut hygiene_ticker = interval(tick_period);
        info!("💀 [RETENTION_ACTIVE]: Hygiene daemon initiated.");

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    info!("💀 [RETENTION_HALT]: Shutdown signal honored.");
                    break;
                }
                _ = hygiene_ticker.tick() => {
                    sweep_once(&application_state, metrics_retention_days).await;
                }
            }
        }
    })
}

/// Una pasada de higiene: métricas, estados OAuth y snapshots fríos.
pub async fn sweep_once(application_state: &AppState, metrics_retention_days: i64) {
    let now = application_state.clock.now();

    // 1. RETENCIÓN DE MÉTRICAS HISTÓRICAS
    let metrics_horizon = now - ChronoDuration::days(metrics_retention_days);
    if let Err(metrics_fault) = application_state.metrics.cleanup(metrics_horizon).await {
        warn!("💀 [METRICS_SWEEP_FAULT]: {}", metrics_fault);
    }

    // 2. PURGA DE ESTADOS OAUTH VENCIDOS
    match application_state.oauth_states.purge_expired(now).await {
        Ok(purged) if purged > 0 => {
            info!("💀 [OAUTH_SWEEP]: {} expired states incinerated.", purged);
        }
        Ok(_) => {}
        Err(oauth_fault) => warn!("💀 [OAUTH_SWEEP_FAULT]: {}", oauth_fault),
    }

    // 3. HISTORIAL DE SNAPSHOTS DEL PROXY
    if let Err(snapshot_fault) = application_state
        .snapshots
        .prune_inactive(SNAPSHOT_HISTORY_KEPT)
        .await
    {
        warn!("💀 [SNAPSHOT_SWEEP_FAULT]: {}", snapshot_fault);
    }
}
