// [libs/infra/db-libsql/src/repositories/project.rs]
/*!
 * =================================================================
 * APARATO: PROJECT REPOSITORY (V5.3 - NETWORK DERIVATION SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE PROYECTOS Y RED PRIVADA DERIVADA
 *
 * # Mathematical Proof (Derivation Atomicity):
 * El nombre de red 'proj_<id>' se deriva DENTRO de la misma transacción
 * del INSERT; ninguna lectura concurrente puede observar un proyecto
 * sin su red canónica.
 * =================================================================
 */

use crate::client::{begin_write, retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_text, column_timestamp, column_i64, column_opt_text, format_ledger_timestamp,
    nullable_text,
};
use crate::signals::{EventBridge, IndexJob};
use chrono::Utc;
use helmsman_domain_models::validation::validate_project_name;
use helmsman_domain_models::{Project, SearchEntityType};
use libsql::{params, Row};
use tracing::{info, instrument};

const PROJECT_COLUMNS: &str =
    "id, name, repo_url, branch, image_target, network_name, created_at";

/// Repositorio de autoridad única para la topología de proyectos.
pub struct ProjectRepository {
    database_client: DbClient,
    event_bridge: EventBridge,
}

impl ProjectRepository {
    pub fn new(client: DbClient, bridge: EventBridge) -> Self {
        Self {
            database_client: client,
            event_bridge: bridge,
        }
    }

    /**
     * Crea un proyecto y deriva su red privada en la misma transacción.
     *
     * # Errors:
     * - `StoreError::Validation`: nombre fuera de 1..=64.
     * - `StoreError::Conflict`: nombre duplicado.
     */
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        name: &str,
        repo_url: Option<String>,
        branch: Option<String>,
        image_target: Option<String>,
    ) -> Result<Project, StoreError> {
        validate_project_name(name)?;

        let connection = self.database_client.connection().await?;
        let project_transaction = begin_write(&connection).await?;

        let created_at = format_ledger_timestamp(Utc::now());
        let effective_branch = branch.unwrap_or_else(|| Project::DEFAULT_BRANCH.to_string());

        let mut insert_rows = project_transaction
            .query(
                "INSERT INTO projects (name, repo_url, branch, image_target, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                params![
                    name,
                    nullable_text(repo_url),
                    effective_branch,
                    nullable_text(image_target),
                    created_at
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("PROJECT"))?;
        let project_id = column_i64(&identity_row, 0)?;

        // Derivación canónica dentro de la MISMA transacción del insert.
        project_transaction
            .execute(
                "UPDATE projects SET network_name = ?2 WHERE id = ?1",
                params![project_id, Project::derive_network_name(project_id)],
            )
            .await
            .map_err(StoreError::classify)?;

        project_transaction
            .commit()
            .await
            .map_err(StoreError::classify)?;

        info!("🏗️ [PROJECT_SEALED]: '{}' materialized with network proj_{}.", name, project_id);

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Project,
            entity_id: project_id,
        });

        self.get(project_id).await
    }

    pub async fn get(&self, project_id: i64) -> Result<Project, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
                params![project_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_project_row(&data_row),
            None => Err(StoreError::NotFound("PROJECT")),
        }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Project, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM projects WHERE name = ?1", PROJECT_COLUMNS),
                params![name],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_project_row(&data_row),
            None => Err(StoreError::NotFound("PROJECT")),
        }
    }

    pub async fn list(&self) -> Result<Vec<Project>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM projects ORDER BY name ASC", PROJECT_COLUMNS),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut project_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            project_collection.push(map_project_row(&data_row)?);
        }
        Ok(project_collection)
    }

    /// Actualiza los campos mutables; `created_at` y `network_name` son inmutables.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        project_id: i64,
        repo_url: Option<String>,
        branch: Option<String>,
        image_target: Option<String>,
    ) -> Result<Project, StoreError> {
        let connection = self.database_client.connection().await?;

        let effective_branch = branch.unwrap_or_else(|| Project::DEFAULT_BRANCH.to_string());
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE projects SET repo_url = ?2, branch = ?3, image_target = ?4 WHERE id = ?1",
                params![
                    project_id,
                    nullable_text(repo_url.clone()),
                    effective_branch.clone(),
                    nullable_text(image_target.clone())
                ],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("PROJECT"));
        }

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Project,
            entity_id: project_id,
        });

        self.get(project_id).await
    }

    /// Elimina el proyecto; los servicios propiedad caen en cascada.
    #[instrument(skip(self))]
    pub async fn delete(&self, project_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute("DELETE FROM projects WHERE id = ?1", params![project_id])
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("PROJECT"));
        }

        info!("🗑️ [PROJECT_PURGED]: Project {} and owned services incinerated.", project_id);

        self.event_bridge.schedule_index(IndexJob::Delete {
            entity_type: SearchEntityType::Project,
            entity_id: project_id,
        });
        Ok(())
    }
}

fn map_project_row(data_row: &Row) -> Result<Project, StoreError> {
    Ok(Project {
        id: column_i64(data_row, 0)?,
        name: column_text(data_row, 1)?,
        repo_url: column_opt_text(data_row, 2)?,
        branch: column_text(data_row, 3)?,
        image_target: column_opt_text(data_row, 4)?,
        network_name: column_text(data_row, 5)?,
        created_at: column_timestamp(data_row, 6)?,
    })
}
