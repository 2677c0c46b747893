// [libs/infra/db-libsql/src/repositories/metrics.rs]
/*!
 * =================================================================
 * APARATO: HISTORICAL METRICS REPOSITORY (V3.3 - RETENTION SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: MUESTRAS MÉTRICAS DEL HOST CON RETENCIÓN ACOTADA
 * =================================================================
 */

use crate::client::DbClient;
use crate::errors::StoreError;
use crate::mapping::{column_f64, column_i64, column_timestamp, format_ledger_timestamp};
use chrono::{DateTime, Utc};
use helmsman_domain_models::MetricSample;
use libsql::{params, Row};
use tracing::{info, instrument};

/// Techo absoluto de filas por consulta cronológica.
const MAX_SINCE_LIMIT: i64 = 50_000;

const SAMPLE_COLUMNS: &str = "id, timestamp, cpu_percent, memory_used_bytes, \
     memory_total_bytes, disk_used_bytes, disk_total_bytes, net_rx_bytes, net_tx_bytes";

/// Repositorio de muestras métricas históricas.
pub struct MetricsRepository {
    database_client: DbClient,
}

impl MetricsRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Sella una muestra puntual del host.
    pub async fn insert(&self, sample: &MetricSample) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        connection
            .execute(
                "INSERT INTO metric_samples (timestamp, cpu_percent, memory_used_bytes, \
                     memory_total_bytes, disk_used_bytes, disk_total_bytes, net_rx_bytes, net_tx_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    format_ledger_timestamp(sample.timestamp),
                    sample.cpu_percent,
                    sample.memory_used_bytes,
                    sample.memory_total_bytes,
                    sample.disk_used_bytes,
                    sample.disk_total_bytes,
                    sample.net_rx_bytes,
                    sample.net_tx_bytes
                ],
            )
            .await
            .map_err(StoreError::classify)?;
        Ok(())
    }

    /// Muestras desde un instante, en orden cronológico (techo 50 000).
    pub async fn since(
        &self,
        horizon: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MetricSample>, StoreError> {
        let effective_limit = limit.clamp(1, MAX_SINCE_LIMIT);

        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM metric_samples
                     WHERE timestamp >= ?1
                     ORDER BY timestamp ASC, id ASC
                     LIMIT ?2",
                    SAMPLE_COLUMNS
                ),
                params![format_ledger_timestamp(horizon), effective_limit],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut sample_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            sample_collection.push(map_sample_row(&data_row)?);
        }
        Ok(sample_collection)
    }

    /// Las N muestras más recientes, retornadas en orden cronológico.
    pub async fn latest(&self, count: i64) -> Result<Vec<MetricSample>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM metric_samples
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?1",
                    SAMPLE_COLUMNS
                ),
                params![count.max(1)],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut sample_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            sample_collection.push(map_sample_row(&data_row)?);
        }
        // Oldest-first hacia el consumidor.
        sample_collection.reverse();
        Ok(sample_collection)
    }

    /// Retención: incinera muestras anteriores al umbral.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let connection = self.database_client.connection().await?;
        let purged_rows = connection
            .execute(
                "DELETE FROM metric_samples WHERE timestamp < ?1",
                params![format_ledger_timestamp(older_than)],
            )
            .await
            .map_err(StoreError::classify)?;

        if purged_rows > 0 {
            info!("🗑️ [METRICS_RETENTION]: {} stale samples incinerated.", purged_rows);
        }
        Ok(purged_rows)
    }
}

fn map_sample_row(data_row: &Row) -> Result<MetricSample, StoreError> {
    Ok(MetricSample {
        id: column_i64(data_row, 0)?,
        timestamp: column_timestamp(data_row, 1)?,
        cpu_percent: column_f64(data_row, 2)?,
        memory_used_bytes: column_i64(data_row, 3)?,
        memory_total_bytes: column_i64(data_row, 4)?,
        disk_used_bytes: column_i64(data_row, 5)?,
        disk_total_bytes: column_i64(data_row, 6)?,
        net_rx_bytes: column_i64(data_row, 7)?,
        net_tx_bytes: column_i64(data_row, 8)?,
    })
}
