// [libs/infra/db-libsql/src/repositories/env_template.rs]
/*!
 * =================================================================
 * APARATO: ENV TEMPLATE REPOSITORY (V2.5 - NOMINAL SYNC)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PLANTILLAS DE ENTORNO REUTILIZABLES ENTRE SERVICIOS
 * =================================================================
 */

use crate::client::{retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_i64, column_opt_text, column_text, column_timestamp, format_ledger_timestamp,
    nullable_text,
};
use crate::signals::{EventBridge, IndexJob};
use chrono::Utc;
use helmsman_domain_models::{EnvTemplate, EnvTemplateVariable, SearchEntityType};
use libsql::{params, Row};
use tracing::instrument;

/// Repositorio de plantillas de entorno.
pub struct EnvTemplateRepository {
    database_client: DbClient,
    event_bridge: EventBridge,
}

impl EnvTemplateRepository {
    pub fn new(client: DbClient, bridge: EventBridge) -> Self {
        Self {
            database_client: client,
            event_bridge: bridge,
        }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<EnvTemplate, StoreError> {
        if name.is_empty() {
            return Err(StoreError::Validation(
                helmsman_domain_models::ValidationFault {
                    field: "env_template.name",
                    rule: "name must be non-empty".into(),
                },
            ));
        }

        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO env_templates (name, description, created_at)
                 VALUES (?1, ?2, ?3)
                 RETURNING id",
                params![
                    name,
                    nullable_text(description),
                    format_ledger_timestamp(Utc::now())
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("ENV_TEMPLATE"))?;
        let template_id = column_i64(&identity_row, 0)?;

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::EnvTemplate,
            entity_id: template_id,
        });

        self.get(template_id).await
    }

    pub async fn get(&self, template_id: i64) -> Result<EnvTemplate, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT id, name, description, created_at FROM env_templates WHERE id = ?1",
                params![template_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_template_row(&data_row),
            None => Err(StoreError::NotFound("ENV_TEMPLATE")),
        }
    }

    pub async fn list(&self) -> Result<Vec<EnvTemplate>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT id, name, description, created_at FROM env_templates ORDER BY name ASC",
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut template_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            template_collection.push(map_template_row(&data_row)?);
        }
        Ok(template_collection)
    }

    /// Fija (o reemplaza) una variable de la plantilla.
    pub async fn set_variable(
        &self,
        template_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::Validation(
                helmsman_domain_models::ValidationFault {
                    field: "env_template.key",
                    rule: "key must be non-empty".into(),
                },
            ));
        }

        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "INSERT INTO env_template_variables (template_id, key, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(template_id, key) DO UPDATE SET value = excluded.value",
                params![template_id, key, value],
            )
        })
        .await?;
        Ok(())
    }

    pub async fn variables(
        &self,
        template_id: i64,
    ) -> Result<Vec<EnvTemplateVariable>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT id, template_id, key, value FROM env_template_variables
                 WHERE template_id = ?1 ORDER BY key ASC",
                params![template_id],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut variable_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            variable_collection.push(EnvTemplateVariable {
                id: column_i64(&data_row, 0)?,
                template_id: column_i64(&data_row, 1)?,
                key: column_text(&data_row, 2)?,
                value: column_text(&data_row, 3)?,
            });
        }
        Ok(variable_collection)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, template_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "DELETE FROM env_templates WHERE id = ?1",
                params![template_id],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("ENV_TEMPLATE"));
        }

        self.event_bridge.schedule_index(IndexJob::Delete {
            entity_type: SearchEntityType::EnvTemplate,
            entity_id: template_id,
        });
        Ok(())
    }
}

fn map_template_row(data_row: &Row) -> Result<EnvTemplate, StoreError> {
    Ok(EnvTemplate {
        id: column_i64(data_row, 0)?,
        name: column_text(data_row, 1)?,
        description: column_opt_text(data_row, 2)?,
        created_at: column_timestamp(data_row, 3)?,
    })
}
