// [libs/infra/db-libsql/src/repositories/snapshot.rs]
/*!
 * =================================================================
 * APARATO: PROXY SNAPSHOT REPOSITORY (V3.2 - SINGLE ACTIVE SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: LEDGER INMUTABLE DE CONFIGURACIONES DEL PROXY
 *
 * # Mathematical Proof (Single Active Invariant):
 * activate() desactiva y activa dentro de UNA transacción, y el índice
 * único parcial sobre (active=1) hace imposible que dos filas activas
 * coexistan incluso ante escritores concurrentes.
 * =================================================================
 */

use crate::client::{begin_write, DbClient};
use crate::errors::StoreError;
use crate::mapping::{column_bool, column_i64, column_text, column_timestamp, format_ledger_timestamp};
use chrono::Utc;
use helmsman_domain_models::ProxyConfigSnapshot;
use libsql::{params, Row};
use tracing::{info, instrument};

const SNAPSHOT_COLUMNS: &str = "id, config_hash, config_content, active, created_at";

/// Repositorio de autoridad única para snapshots del proxy inverso.
pub struct SnapshotRepository {
    database_client: DbClient,
}

impl SnapshotRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Inserta un snapshot INACTIVO; la activación es un paso separado.
    #[instrument(skip(self, config_content))]
    pub async fn insert(
        &self,
        config_hash: &str,
        config_content: &str,
    ) -> Result<ProxyConfigSnapshot, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO proxy_config_snapshots (config_hash, config_content, active, created_at)
                 VALUES (?1, ?2, 0, ?3)
                 RETURNING id",
                params![
                    config_hash,
                    config_content,
                    format_ledger_timestamp(Utc::now())
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("PROXY_SNAPSHOT"))?;
        let snapshot_id = column_i64(&identity_row, 0)?;

        self.get(snapshot_id).await
    }

    /**
     * Activa exactamente un snapshot en una única transacción:
     * limpia toda fila activa y enciende la solicitada.
     *
     * # Errors:
     * - `StoreError::NotFound`: el identificador no existe; la transacción
     *   se revierte y el snapshot previo permanece activo.
     */
    #[instrument(skip(self))]
    pub async fn activate(&self, snapshot_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let activation_transaction = begin_write(&connection).await?;

        activation_transaction
            .execute(
                "UPDATE proxy_config_snapshots SET active = 0 WHERE active = 1",
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let affected_rows = activation_transaction
            .execute(
                "UPDATE proxy_config_snapshots SET active = 1 WHERE id = ?1",
                params![snapshot_id],
            )
            .await
            .map_err(StoreError::classify)?;

        if affected_rows == 0 {
            activation_transaction
                .rollback()
                .await
                .map_err(StoreError::classify)?;
            return Err(StoreError::NotFound("PROXY_SNAPSHOT"));
        }

        activation_transaction
            .commit()
            .await
            .map_err(StoreError::classify)?;

        info!("📡 [SNAPSHOT_ACTIVATED]: Configuration {} is now live.", snapshot_id);
        Ok(())
    }

    /// Snapshot activo vigente, si existe.
    pub async fn active(&self) -> Result<Option<ProxyConfigSnapshot>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM proxy_config_snapshots WHERE active = 1 LIMIT 1",
                    SNAPSHOT_COLUMNS
                ),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => Ok(Some(map_snapshot_row(&data_row)?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, snapshot_id: i64) -> Result<ProxyConfigSnapshot, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM proxy_config_snapshots WHERE id = ?1",
                    SNAPSHOT_COLUMNS
                ),
                params![snapshot_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_snapshot_row(&data_row),
            None => Err(StoreError::NotFound("PROXY_SNAPSHOT")),
        }
    }

    pub async fn list(&self, limit: i64) -> Result<Vec<ProxyConfigSnapshot>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM proxy_config_snapshots
                     ORDER BY created_at DESC, id DESC LIMIT ?1",
                    SNAPSHOT_COLUMNS
                ),
                params![limit],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut snapshot_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            snapshot_collection.push(map_snapshot_row(&data_row)?);
        }
        Ok(snapshot_collection)
    }

    /// Higiene del ledger: conserva las N filas inactivas más recientes.
    #[instrument(skip(self))]
    pub async fn prune_inactive(&self, keep_latest: i64) -> Result<u64, StoreError> {
        let connection = self.database_client.connection().await?;
        let purged_rows = connection
            .execute(
                "DELETE FROM proxy_config_snapshots
                 WHERE active = 0 AND id NOT IN (
                     SELECT id FROM proxy_config_snapshots
                     WHERE active = 0
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?1
                 )",
                params![keep_latest],
            )
            .await
            .map_err(StoreError::classify)?;
        Ok(purged_rows)
    }
}

fn map_snapshot_row(data_row: &Row) -> Result<ProxyConfigSnapshot, StoreError> {
    Ok(ProxyConfigSnapshot {
        id: column_i64(data_row, 0)?,
        config_hash: column_text(data_row, 1)?,
        config_content: column_text(data_row, 2)?,
        active: column_bool(data_row, 3)?,
        created_at: column_timestamp(data_row, 4)?,
    })
}
