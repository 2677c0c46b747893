// [libs/infra/db-libsql/src/repositories/audit.rs]
/*!
 * =================================================================
 * APARATO: AUDIT TRAIL REPOSITORY (V4.1 - APPEND-ONLY SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RASTRO DE AUDITORÍA INMUTABLE DEL PLANO DE CONTROL
 *
 * # Mathematical Proof (Append-Only Discipline):
 * El repositorio expone únicamente record() y list(); sin UPDATE ni
 * DELETE, el rastro es una secuencia monótona de evidencia.
 * =================================================================
 */

use crate::client::DbClient;
use crate::errors::StoreError;
use crate::mapping::{column_i64, column_text, column_timestamp, format_ledger_timestamp};
use chrono::Utc;
use helmsman_domain_models::AuditEntry;
use libsql::{params, Row};
use tracing::instrument;

/// Límite por defecto y techo absoluto del listado de auditoría.
const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 100;

/// Repositorio append-only del rastro de auditoría.
pub struct AuditRepository {
    database_client: DbClient,
}

impl AuditRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Sella una entrada inmutable de evidencia.
    #[instrument(skip(self, meta))]
    pub async fn record(
        &self,
        actor: &str,
        action: &str,
        target_type: &str,
        target_id: &str,
        meta: serde_json::Value,
    ) -> Result<(), StoreError> {
        let meta_json =
            serde_json::to_string(&meta).map_err(|e| StoreError::Mapping(e.to_string()))?;

        let connection = self.database_client.connection().await?;
        connection
            .execute(
                "INSERT INTO audit_entries (timestamp, actor, action, target_type, target_id, meta_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    format_ledger_timestamp(Utc::now()),
                    actor,
                    action,
                    target_type,
                    target_id,
                    meta_json
                ],
            )
            .await
            .map_err(StoreError::classify)?;
        Ok(())
    }

    /**
     * Lista las entradas más recientes primero.
     * Límite por defecto 50; techo duro 100.
     */
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<AuditEntry>, StoreError> {
        let effective_limit = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);

        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT id, timestamp, actor, action, target_type, target_id, meta_json
                 FROM audit_entries
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
                params![effective_limit],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut entry_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            entry_collection.push(map_audit_row(&data_row)?);
        }
        Ok(entry_collection)
    }
}

fn map_audit_row(data_row: &Row) -> Result<AuditEntry, StoreError> {
    let meta_json = column_text(data_row, 6)?;
    Ok(AuditEntry {
        id: column_i64(data_row, 0)?,
        timestamp: column_timestamp(data_row, 1)?,
        actor: column_text(data_row, 2)?,
        action: column_text(data_row, 3)?,
        target_type: column_text(data_row, 4)?,
        target_id: column_text(data_row, 5)?,
        meta: serde_json::from_str(&meta_json).map_err(|e| StoreError::Mapping(e.to_string()))?,
    })
}
