// [apps/controller/src/main.rs]
/*!
 * =================================================================
 * APARATO: CONTROLLER MAIN ENTRY POINT (V5.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * El proceso garantiza que las migraciones y la reparación del índice
 * ocurran antes de la ignición de los daemons, previniendo estados de
 * carrera donde un lazo observe un esquema a medio materializar.
 * =================================================================
 */

use helmsman_controller::prelude::*;

use dotenvy::dotenv;
use helmsman_shared_pharos::init_tracing;
use std::sync::Arc;
use tracing::info;

/**
 * Punto de ignición supremo del binario del plano de control.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (PHAROS)
    init_tracing("helmsman_controller");

    // 3. RUNTIME SOBERANO
    let runtime_controller = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_controller.block_on(async {
        info!("🛰️ [CONTROL_PLANE]: Global ignition sequence starting...");

        let configuration = KernelConfig::from_environment();

        // 4. COLABORADORES EXTERNOS
        // Los seams reales (Docker, proxy, ACME, DNS) se cablean desde los
        // crates de integración del host; los stand-ins Detached* permiten
        // la ignición degradada del núcleo.
        let collaborators = Collaborators {
            docker: Arc::new(DetachedDocker),
            proxy: Arc::new(DetachedProxy),
            acme: Arc::new(DetachedAcme),
            dns: Arc::new(DetachedDns),
            clock: Arc::new(SystemClock),
        };

        // 5. IGNICIÓN DEL KERNEL
        let kernel_instance = ControllerKernel::ignite(configuration, collaborators).await?;
        info!("🚀 [HELMSMAN_ONLINE]: Control plane fully operational.");

        // 6. ESPERA DE SEÑAL DE CIERRE DEL SISTEMA OPERATIVO
        tokio::signal::ctrl_c().await?;
        kernel_instance.shutdown().await;

        Ok(())
    })
}
