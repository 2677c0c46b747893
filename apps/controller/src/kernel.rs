// INICIO DEL ARCHIVO [apps/controller/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: CONTROLLER KERNEL (V6.0 - IGNITION SEQUENCER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: ENSAMBLAJE DEL NEXO E IGNICIÓN DE DAEMONS
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. ORDERED IGNITION: Ledger -> índice -> reparación inicial -> daemons;
 *    ningún daemon observa un esquema a medio migrar.
 * 2. COOPERATIVE SHUTDOWN: Un canal watch señala el cierre; cada daemon
 *    lo consulta entre ticks y en cada punto de suspensión.
 * 3. CADENCE CATALOG: Los períodos de cada lazo viven en la
 *    configuración del kernel, no dispersos por los daemons.
 * =================================================================
 */

use crate::services::{
    cert_manager, health_sentinel, index_maintainer, proxy_pipeline, reconciler, retention,
};
use crate::state::{AppState, Collaborators};
use helmsman_infra_db::StoreError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// Configuración de ignición del plano de control.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub database_url: String,
    pub reconcile_period: Duration,
    pub probe_period: Duration,
    pub pipeline_period: Duration,
    pub cert_sweep_period: Duration,
    pub index_repair_period: Duration,
    pub retention_period: Duration,
    pub metrics_retention_days: i64,
}

impl KernelConfig {
    /// Hidrata la configuración desde el entorno del proceso.
    pub fn from_environment() -> Self {
        Self {
            database_url: std::env::var("HELMSMAN_DB_URL")
                .unwrap_or_else(|_| "file:helmsman.db".to_string()),
            reconcile_period: Duration::from_secs(3),
            probe_period: Duration::from_secs(15),
            pipeline_period: Duration::from_secs(5),
            cert_sweep_period: Duration::from_secs(3600),
            index_repair_period: Duration::from_secs(300),
            retention_period: Duration::from_secs(3600),
            metrics_retention_days: std::env::var("HELMSMAN_METRICS_RETENTION_DAYS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(7),
        }
    }
}

/// Kernel soberano: nexo de estado + manijas de los daemons vivos.
pub struct ControllerKernel {
    pub application_shared_state: Arc<AppState>,
    shutdown_sender: watch::Sender<bool>,
    daemon_handles: Vec<JoinHandle<()>>,
}

impl ControllerKernel {
    /**
     * Secuencia de ignición completa del plano de control.
     *
     * # Errors:
     * - `StoreError`: apertura del Ledger o materialización del índice.
     */
    #[instrument(skip(configuration, collaborators))]
    pub async fn ignite(
        configuration: KernelConfig,
        collaborators: Collaborators,
    ) -> Result<Self, StoreError> {
        info!("🛰️ [KERNEL_IGNITION]: Assembling control plane nexus...");

        // 1. NEXO: Ledger (migraciones incluidas), índice y repositorios.
        let (application_shared_state, index_queue_receiver) =
            AppState::assemble(&configuration.database_url, collaborators).await?;

        // 2. REPARACIÓN INICIAL DEL ÍNDICE: restituye señales perdidas
        // por cualquier colapso previo al despacho post-commit.
        index_maintainer::run_full_repair(&application_shared_state).await;

        // 3. IGNICIÓN DE DAEMONS COOPERATIVOS
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let daemon_handles = vec![
            reconciler::spawn_reconciler(
                application_shared_state.clone(),
                shutdown_receiver.clone(),
                configuration.reconcile_period,
            ),
            reconciler::spawn_exit_observer(
                application_shared_state.clone(),
                shutdown_receiver.clone(),
            ),
            health_sentinel::spawn_health_sentinel(
                application_shared_state.clone(),
                shutdown_receiver.clone(),
                configuration.probe_period,
            ),
            proxy_pipeline::spawn_proxy_pipeline(
                application_shared_state.clone(),
                shutdown_receiver.clone(),
                configuration.pipeline_period,
            ),
            cert_manager::spawn_expiry_sweep(
                application_shared_state.clone(),
                shutdown_receiver.clone(),
                configuration.cert_sweep_period,
            ),
            index_maintainer::spawn_index_maintainer(
                application_shared_state.clone(),
                index_queue_receiver,
                shutdown_receiver.clone(),
                configuration.index_repair_period,
            ),
            retention::spawn_retention(
                application_shared_state.clone(),
                shutdown_receiver,
                configuration.retention_period,
                configuration.metrics_retention_days,
            ),
        ];

        info!("🚀 [KERNEL_ONLINE]: {} daemons operational.", daemon_handles.len());

        Ok(Self {
            application_shared_state,
            shutdown_sender,
            daemon_handles,
        })
    }

    /// Señala el cierre cooperativo y espera la retirada de cada daemon.
    pub async fn shutdown(self) {
        info!("🛑 [KERNEL_SHUTDOWN]: Cooperative halt signaled.");
        let _ = self.shutdown_sender.send(true);

        for daemon_handle in self.daemon_handles {
            let _ = daemon_handle.await;
        }
        info!("🛑 [KERNEL_RETIRED]: All daemons halted cleanly.");
    }
}
// FIN DEL ARCHIVO [apps/controller/src/kernel.rs]
