// [libs/infra/db-libsql/src/repositories/integrations.rs]
/*!
 * =================================================================
 * APARATO: INTEGRATIONS REPOSITORY (V2.2 - EXTERNAL LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: INSTALACIONES GITHUB, MAPEOS Y ENTREGAS DE WEBHOOKS
 *
 * Los colaboradores externos (GitHub App, parsers de webhook) viven fuera
 * del plano de control; este repositorio solo persiste sus huellas.
 * =================================================================
 */

use crate::client::{retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_i64, column_opt_timestamp, column_text, column_timestamp, format_ledger_timestamp,
};
use chrono::{DateTime, Utc};
use helmsman_domain_models::WebhookDelivery;
use libsql::{params, Row};
use tracing::instrument;

/// Huella persistida de una instalación de GitHub App.
#[derive(Debug, Clone)]
pub struct GithubInstallation {
    pub id: i64,
    pub installation_id: i64,
    pub account_login: String,
    pub created_at: DateTime<Utc>,
}

/// Repositorio de integraciones externas.
pub struct IntegrationRepository {
    database_client: DbClient,
}

impl IntegrationRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Alta o refresco idempotente de una instalación.
    #[instrument(skip(self))]
    pub async fn upsert_installation(
        &self,
        installation_id: i64,
        account_login: &str,
    ) -> Result<GithubInstallation, StoreError> {
        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "INSERT INTO github_installations (installation_id, account_login, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(installation_id) DO UPDATE SET
                     account_login = excluded.account_login",
                params![
                    installation_id,
                    account_login,
                    format_ledger_timestamp(Utc::now())
                ],
            )
        })
        .await?;

        let mut query_results = connection
            .query(
                "SELECT id, installation_id, account_login, created_at
                 FROM github_installations WHERE installation_id = ?1",
                params![installation_id],
            )
            .await
            .map_err(StoreError::classify)?;

        let data_row = query_results
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("GITHUB_INSTALLATION"))?;

        Ok(GithubInstallation {
            id: column_i64(&data_row, 0)?,
            installation_id: column_i64(&data_row, 1)?,
            account_login: column_text(&data_row, 2)?,
            created_at: column_timestamp(&data_row, 3)?,
        })
    }

    /// Registra un repositorio visible para una instalación.
    pub async fn add_repo(
        &self,
        installation_fk: i64,
        full_name: &str,
        default_branch: &str,
    ) -> Result<i64, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO github_repos (installation_id, full_name, default_branch)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(installation_id, full_name) DO UPDATE SET
                     default_branch = excluded.default_branch
                 RETURNING id",
                params![installation_fk, full_name, default_branch],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("GITHUB_REPO"))?;
        column_i64(&identity_row, 0)
    }

    /// Mapea un repositorio hacia un proyecto (y opcionalmente un servicio).
    #[instrument(skip(self))]
    pub async fn map_repo(
        &self,
        repo_id: i64,
        project_id: i64,
        service_id: Option<i64>,
    ) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "INSERT INTO github_repo_mappings (repo_id, project_id, service_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(repo_id, project_id) DO UPDATE SET
                     service_id = excluded.service_id",
                params![
                    repo_id,
                    project_id,
                    crate::mapping::nullable_i64(service_id),
                    format_ledger_timestamp(Utc::now())
                ],
            )
        })
        .await?;
        Ok(())
    }

    /**
     * Sella un evento de webhook de GitHub; el GUID de entrega es único.
     * Retorna false cuando el evento ya había sido registrado (replay).
     */
    pub async fn record_webhook_event(
        &self,
        delivery_guid: &str,
        event: &str,
        action: Option<&str>,
        payload: serde_json::Value,
    ) -> Result<bool, StoreError> {
        let payload_json =
            serde_json::to_string(&payload).map_err(|e| StoreError::Mapping(e.to_string()))?;

        let connection = self.database_client.connection().await?;
        let inserted_rows = connection
            .execute(
                "INSERT OR IGNORE INTO github_webhook_events \
                     (delivery_guid, event, action, payload_json, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    delivery_guid,
                    event,
                    crate::mapping::nullable_text(action.map(str::to_string)),
                    payload_json,
                    format_ledger_timestamp(Utc::now())
                ],
            )
            .await
            .map_err(StoreError::classify)?;
        Ok(inserted_rows > 0)
    }

    /// Sella una entrega genérica de webhook.
    pub async fn record_delivery(
        &self,
        source: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<i64, StoreError> {
        let payload_json =
            serde_json::to_string(&payload).map_err(|e| StoreError::Mapping(e.to_string()))?;

        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO webhook_deliveries (source, event, payload_json, received_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                params![source, event, payload_json, format_ledger_timestamp(Utc::now())],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("WEBHOOK_DELIVERY"))?;
        column_i64(&identity_row, 0)
    }

    pub async fn mark_delivery_processed(
        &self,
        delivery_id: i64,
        processed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE webhook_deliveries SET processed_at = ?2 WHERE id = ?1",
                params![delivery_id, format_ledger_timestamp(processed_at)],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("WEBHOOK_DELIVERY"));
        }
        Ok(())
    }

    pub async fn list_deliveries(&self, limit: i64) -> Result<Vec<WebhookDelivery>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT id, source, event, payload_json, received_at, processed_at
                 FROM webhook_deliveries
                 ORDER BY received_at DESC, id DESC LIMIT ?1",
                params![limit.clamp(1, 100)],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut delivery_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            delivery_collection.push(map_delivery_row(&data_row)?);
        }
        Ok(delivery_collection)
    }
}

fn map_delivery_row(data_row: &Row) -> Result<WebhookDelivery, StoreError> {
    let payload_json = column_text(data_row, 3)?;
    Ok(WebhookDelivery {
        id: column_i64(data_row, 0)?,
        source: column_text(data_row, 1)?,
        event: column_text(data_row, 2)?,
        payload: serde_json::from_str(&payload_json)
            .map_err(|e| StoreError::Mapping(e.to_string()))?,
        received_at: column_timestamp(data_row, 4)?,
        processed_at: column_opt_timestamp(data_row, 5)?,
    })
}
