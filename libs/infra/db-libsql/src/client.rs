// INICIO DEL ARCHIVO [libs/infra/db-libsql/src/client.rs]
/*!
 * =================================================================
 * APARATO: DATABASE CONNECTION CLIENT (V5.1 - WAL HARDENED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTIÓN DE ENLACES TÁCTICOS Y PERSISTENCIA ACID
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. WAL SOVEREIGNTY: Cada apertura sella journal_mode=WAL y
 *    foreign_keys=ON antes de que cualquier repositorio toque el Ledger.
 * 2. MEMORY ANCHOR: En modo RAM, una conexión ancla mantiene viva la
 *    base compartida para que el esquema sea visible entre hilos.
 * 3. BOUNDED RETRY: La contención WAL se reintenta con backoff acotado
 *    (≤3 intentos, ≤100ms) antes de degradar a TransientStorage.
 *
 * # Mathematical Proof (Single-Writer Semantics):
 * WAL + BEGIN IMMEDIATE serializa todos los escritores en el motor;
 * los lectores nunca bloquean. El cliente solo materializa conexiones;
 * jamás retiene cerrojos de aplicación a través de puntos de suspensión.
 * =================================================================
 */

use crate::errors::{is_busy_signature, StoreError};
use crate::migrations::apply_pending_migrations;
use libsql::{Builder, Connection, Database, Transaction, TransactionBehavior};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Presupuesto total de reintentos ante contención WAL.
const BUSY_RETRY_ATTEMPTS: u32 = 3;
const BUSY_RETRY_BASE_DELAY_MS: u64 = 20;

#[derive(Clone)]
pub struct DbClient {
    internal_database_driver: Arc<Database>,
    /// Mantiene la base de datos viva en memoria evitando que SQLite la purgue.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl DbClient {
    /**
     * Abre el Ledger local (fichero o memoria), sella los pragmas WAL/FK
     * y aplica las migraciones pendientes antes de entregar el cliente.
     *
     * # Errors:
     * - `StoreError::Query`: URL vacía, driver inoperante o migración fallida.
     */
    #[instrument(skip(database_connection_url))]
    pub async fn connect(database_connection_url: &str) -> Result<Self, StoreError> {
        if database_connection_url.is_empty() {
            return Err(StoreError::Query("CRITICAL_FAULT: DATABASE_URL_UNDEFINED".into()));
        }

        info!("🔌 [DATABASE]: Initiating tactical link to [{}]", database_connection_url);

        let is_memory = database_connection_url.contains(":memory:")
            || database_connection_url.contains("mode=memory");

        let database_driver = Builder::new_local(database_connection_url)
            .build()
            .await
            .map_err(|e| StoreError::Query(format!("DRIVER_IGNITION_FAILURE: {}", e)))?;

        let shared_driver = Arc::new(database_driver);
        let mut anchor = None;

        if is_memory {
            // En modo memoria el ancla se abre ANTES de cualquier otra
            // operación para que el esquema resida en el segmento compartido.
            let anchor_connection = shared_driver
                .connect()
                .map_err(|e| StoreError::Query(format!("ANCHOR_FAULT: {}", e)))?;

            seal_connection_pragmas(&anchor_connection).await?;
            apply_pending_migrations(&anchor_connection).await?;

            anchor = Some(Arc::new(anchor_connection));
            info!("⚓ [DATABASE]: Memory strata solidified and anchored.");
        } else {
            let bootstrap_connection = shared_driver
                .connect()
                .map_err(|e| StoreError::Query(format!("BOOTSTRAP_LINK_FAULT: {}", e)))?;

            seal_connection_pragmas(&bootstrap_connection).await?;
            apply_pending_migrations(&bootstrap_connection).await?;
        }

        Ok(Self {
            internal_database_driver: shared_driver,
            _memory_persistence_anchor: anchor,
        })
    }

    /// Materializa una conexión con los pragmas de sesión ya sellados.
    pub async fn connection(&self) -> Result<Connection, StoreError> {
        let connection = self.internal_database_driver.connect().map_err(|e| {
            error!("⚠️ [POOL_FAULT]: Connection allocation failed: {}", e);
            StoreError::Query(e.to_string())
        })?;
        seal_connection_pragmas(&connection).await?;
        Ok(connection)
    }
}

/// Sella los pragmas de sesión: WAL, llaves foráneas y ventana de espera.
async fn seal_connection_pragmas(connection: &Connection) -> Result<(), StoreError> {
    // Los PRAGMA retornan filas; se drenan vía query para no confundir al motor.
    for pragma_statement in [
        "PRAGMA journal_mode = WAL",
        "PRAGMA foreign_keys = ON",
        "PRAGMA busy_timeout = 250",
    ] {
        let mut pragma_rows = connection
            .query(pragma_statement, ())
            .await
            .map_err(StoreError::classify)?;
        while pragma_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .is_some()
        {}
    }
    Ok(())
}

/// Abre una transacción de escritura con semántica BEGIN IMMEDIATE.
pub async fn begin_write(connection: &Connection) -> Result<Transaction, StoreError> {
    connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .await
        .map_err(StoreError::classify)
}

/**
 * Ejecuta una operación del motor reintentando la contención WAL.
 *
 * El constructor de futuro se re-invoca en cada intento; tres fallos
 * consecutivos por cerrojo degradan a `TransientStorage`.
 */
pub async fn retry_busy<T, F, Fut>(mut engine_operation: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, libsql::Error>>,
{
    let mut attempt_index = 0u32;
    loop {
        match engine_operation().await {
            Ok(value) => return Ok(value),
            Err(engine_fault) => {
                let message = engine_fault.to_string();
                if is_busy_signature(&message) && attempt_index + 1 < BUSY_RETRY_ATTEMPTS {
                    attempt_index += 1;
                    let backoff_delay =
                        Duration::from_millis(BUSY_RETRY_BASE_DELAY_MS * attempt_index as u64);
                    tokio::time::sleep(backoff_delay).await;
                    continue;
                }
                return Err(StoreError::classify(engine_fault));
            }
        }
    }
}
// FIN DEL ARCHIVO [libs/infra/db-libsql/src/client.rs]
