// [apps/controller/src/bin/migrator.rs]
/*!
 * =================================================================
 * APARATO: SCHEMA MIGRATOR BINARY (V3.0 - MAINTENANCE SHELL)
 * CLASIFICACIÓN: MAINTENANCE TOOLING (ESTRATO L4)
 * RESPONSABILIDAD: APLICACIÓN MANUAL DE MIGRACIONES PENDIENTES
 * =================================================================
 */

use anyhow::Result;
use dotenvy::dotenv;
use helmsman_infra_db::migrations::max_applied_version;
use helmsman_infra_db::DbClient;
use helmsman_shared_pharos::init_tracing;
use tracing::info;

fn main() -> Result<()> {
    dotenv().ok();
    init_tracing("helmsman_migrator");

    let runtime_migrator = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime_migrator.block_on(async {
        let database_url = std::env::var("HELMSMAN_DB_URL")
            .unwrap_or_else(|_| "file:helmsman.db".to_string());

        // La apertura del cliente aplica toda migración pendiente.
        let database_client = DbClient::connect(&database_url).await?;
        let connection = database_client.connection().await?;
        let ledger_version = max_applied_version(&connection).await?;

        info!("🏗️ [MIGRATOR_SEALED]: Ledger level V{:03}.", ledger_version);
        Ok(())
    })
}
