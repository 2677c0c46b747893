// [libs/infra/db-libsql/src/repositories/service.rs]
/*!
 * =================================================================
 * APARATO: SERVICE REPOSITORY (V8.1 - FSM PERSISTENCE SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE SERVICIOS, ENLACES Y CRASH-LOOP
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. WHOLE-ROW RUNTIME WRITES: Los campos de runtime (contador, ventana,
 *    bandera, estado deseado) se escriben en una sola sentencia UPDATE
 *    para que L1/L2/L3 jamás se pisen parcialmente.
 * 2. UNLOCK EXCLUSIVITY: set_desired_state(running) sobre un servicio en
 *    crash-loop es rechazado; unlock() es la única salida legal.
 * 3. UNORDERED EDGES: Los enlaces se normalizan (menor, mayor) y caen en
 *    cascada al eliminar cualquiera de los extremos.
 * =================================================================
 */

use crate::client::{retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_bool, column_i64, column_opt_i64, column_opt_text, column_opt_timestamp, column_text,
    column_timestamp, format_ledger_timestamp, nullable_i64, nullable_text, nullable_timestamp,
};
use crate::signals::{EventBridge, IndexJob};
use chrono::{DateTime, Utc};
use helmsman_domain_models::validation::validate_service_name;
use helmsman_domain_models::{
    crash_loop_step, crash_loop_unlock, CrashLoopVerdict, DesiredState, HealthStatus,
    PortBinding, SearchEntityType, Service, VolumeBinding,
};
use libsql::{params, Row};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

const SERVICE_COLUMNS: &str = "id, project_id, name, description, image, container_id, \
     env_json, ports_json, volumes_json, registry_id, health_path, desired_state, \
     last_exit_code, restart_count, restart_window_at, crash_looping, health_status, \
     last_probe_at, created_at";

/// Especificación de creación/actualización de un servicio.
#[derive(Debug, Clone, Default)]
pub struct ServiceSpec {
    pub description: Option<String>,
    /// Entorno inline del contenedor; las variables gestionadas (incluidos
    /// secretos) viven en la tabla env_vars y se superponen al resolver.
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortBinding>,
    pub volumes: Vec<VolumeBinding>,
    pub registry_id: Option<i64>,
    pub health_path: Option<String>,
}

/// Repositorio de autoridad única para el ciclo de vida de servicios.
pub struct ServiceRepository {
    database_client: DbClient,
    event_bridge: EventBridge,
}

impl ServiceRepository {
    pub fn new(client: DbClient, bridge: EventBridge) -> Self {
        Self {
            database_client: client,
            event_bridge: bridge,
        }
    }

    /**
     * Registra un servicio bajo un proyecto existente.
     *
     * # Errors:
     * - `StoreError::Validation`: nombre fuera de la disciplina DNS-label.
     * - `StoreError::Conflict`: nombre duplicado dentro del proyecto.
     */
    #[instrument(skip(self, specification))]
    pub async fn create(
        &self,
        project_id: i64,
        name: &str,
        image: &str,
        specification: ServiceSpec,
    ) -> Result<Service, StoreError> {
        validate_service_name(name)?;
        if image.is_empty() {
            return Err(StoreError::Validation(
                helmsman_domain_models::ValidationFault {
                    field: "service.image",
                    rule: "image reference is required".into(),
                },
            ));
        }

        let env_json = serde_json::to_string(&specification.env)
            .map_err(|e| StoreError::Mapping(e.to_string()))?;
        let ports_json = serde_json::to_string(&specification.ports)
            .map_err(|e| StoreError::Mapping(e.to_string()))?;
        let volumes_json = serde_json::to_string(&specification.volumes)
            .map_err(|e| StoreError::Mapping(e.to_string()))?;

        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO services (project_id, name, description, image, env_json, \
                     ports_json, volumes_json, registry_id, health_path, desired_state, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'stopped', ?10)
                 RETURNING id",
                params![
                    project_id,
                    name,
                    nullable_text(specification.description),
                    image,
                    env_json,
                    ports_json,
                    volumes_json,
                    nullable_i64(specification.registry_id),
                    nullable_text(specification.health_path),
                    format_ledger_timestamp(Utc::now())
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("SERVICE"))?;
        let service_id = column_i64(&identity_row, 0)?;

        info!("🚢 [SERVICE_SEALED]: '{}' registered under project {}.", name, project_id);

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Service,
            entity_id: service_id,
        });

        self.get(service_id).await
    }

    pub async fn get(&self, service_id: i64) -> Result<Service, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM services WHERE id = ?1", SERVICE_COLUMNS),
                params![service_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_service_row(&data_row),
            None => Err(StoreError::NotFound("SERVICE")),
        }
    }

    pub async fn get_by_name(
        &self,
        project_id: i64,
        name: &str,
    ) -> Result<Service, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM services WHERE project_id = ?1 AND name = ?2",
                    SERVICE_COLUMNS
                ),
                params![project_id, name],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_service_row(&data_row),
            None => Err(StoreError::NotFound("SERVICE")),
        }
    }

    /// Resolución inversa para el observador de salidas del Reconciler.
    pub async fn get_by_container(
        &self,
        container_id: &str,
    ) -> Result<Option<Service>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM services WHERE container_id = ?1",
                    SERVICE_COLUMNS
                ),
                params![container_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => Ok(Some(map_service_row(&data_row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_by_project(&self, project_id: i64) -> Result<Vec<Service>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM services WHERE project_id = ?1 ORDER BY name ASC",
                    SERVICE_COLUMNS
                ),
                params![project_id],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut service_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            service_collection.push(map_service_row(&data_row)?);
        }
        Ok(service_collection)
    }

    /// Conjunto completo para los lazos del Reconciler.
    pub async fn list_all(&self) -> Result<Vec<Service>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM services ORDER BY id ASC", SERVICE_COLUMNS),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut service_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            service_collection.push(map_service_row(&data_row)?);
        }
        Ok(service_collection)
    }

    /// Actualiza la especificación mutable del contenedor.
    #[instrument(skip(self, specification))]
    pub async fn update_spec(
        &self,
        service_id: i64,
        image: &str,
        specification: ServiceSpec,
    ) -> Result<Service, StoreError> {
        let env_json = serde_json::to_string(&specification.env)
            .map_err(|e| StoreError::Mapping(e.to_string()))?;
        let ports_json = serde_json::to_string(&specification.ports)
            .map_err(|e| StoreError::Mapping(e.to_string()))?;
        let volumes_json = serde_json::to_string(&specification.volumes)
            .map_err(|e| StoreError::Mapping(e.to_string()))?;

        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE services SET description = ?2, image = ?3, env_json = ?4, \
                     ports_json = ?5, volumes_json = ?6, registry_id = ?7, health_path = ?8 \
                 WHERE id = ?1",
                params![
                    service_id,
                    nullable_text(specification.description.clone()),
                    image,
                    env_json.clone(),
                    ports_json.clone(),
                    volumes_json.clone(),
                    nullable_i64(specification.registry_id),
                    nullable_text(specification.health_path.clone())
                ],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("SERVICE"));
        }

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Service,
            entity_id: service_id,
        });

        self.get(service_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, service_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute("DELETE FROM services WHERE id = ?1", params![service_id])
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("SERVICE"));
        }

        self.event_bridge.schedule_index(IndexJob::Delete {
            entity_type: SearchEntityType::Service,
            entity_id: service_id,
        });
        Ok(())
    }

    // --- ESTRATO DE INTENCIÓN DEL OPERADOR ---

    /**
     * Fija el estado deseado del servicio.
     *
     * # Errors:
     * - `StoreError::PreconditionFailed`: intento de arrancar un servicio
     *   retenido en crash-loop; unlock() es la única salida legal.
     */
    #[instrument(skip(self))]
    pub async fn set_desired_state(
        &self,
        service_id: i64,
        desired: DesiredState,
    ) -> Result<(), StoreError> {
        let current = self.get(service_id).await?;

        if current.crash_looping && desired == DesiredState::Running {
            return Err(StoreError::PreconditionFailed(
                "CRASH_LOOP_HOLD: unlock is the only legal exit".into(),
            ));
        }

        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "UPDATE services SET desired_state = ?2 WHERE id = ?1",
                params![service_id, desired.as_str()],
            )
        })
        .await?;

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Service,
            entity_id: service_id,
        });
        Ok(())
    }

    // --- ESTRATO DE OBSERVACIÓN DEL RECONCILER ---

    /// Registra la identidad del contenedor materializado (o su ausencia).
    pub async fn record_observed_container(
        &self,
        service_id: i64,
        container_id: Option<String>,
    ) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE services SET container_id = ?2 WHERE id = ?1",
                params![service_id, nullable_text(container_id.clone())],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("SERVICE"));
        }
        Ok(())
    }

    /**
     * Registra una salida de contenedor y ejecuta un paso de la FSM.
     *
     * La escritura de runtime es de fila completa: código de salida,
     * contador, ventana, bandera y estado deseado viajan en una sola
     * sentencia UPDATE idempotente.
     */
    #[instrument(skip(self))]
    pub async fn record_exit(
        &self,
        service_id: i64,
        exit_code: i64,
        observation_instant: DateTime<Utc>,
    ) -> Result<CrashLoopVerdict, StoreError> {
        let current = self.get(service_id).await?;

        let verdict = crash_loop_step(
            current.restart_count,
            current.restart_window_at,
            current.desired_state,
            exit_code,
            observation_instant,
        );

        self.apply_runtime_verdict(service_id, Some(exit_code), &verdict)
            .await?;

        if verdict.crash_looping && !current.crash_looping {
            warn!(
                "🛑 [CRASH_LOOP_TRIPPED]: Service {} held down after {} non-zero exits.",
                service_id, verdict.restart_count
            );
        }
        Ok(verdict)
    }

    /**
     * Desbloquea un servicio retenido: única salida del crash-loop.
     * Restituye desired_state = running y resetea contador y ventana.
     */
    #[instrument(skip(self))]
    pub async fn unlock(&self, service_id: i64) -> Result<(), StoreError> {
        // Valida existencia antes de aplicar el veredicto de desbloqueo.
        self.get(service_id).await?;

        let verdict = crash_loop_unlock();
        self.apply_runtime_verdict(service_id, None, &verdict).await?;

        info!("🔓 [CRASH_LOOP_RELEASED]: Service {} restored to running intent.", service_id);

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Service,
            entity_id: service_id,
        });
        Ok(())
    }

    /// Registra el veredicto de una sonda de salud; siempre sella last_probe_at.
    pub async fn record_probe(
        &self,
        service_id: i64,
        verdict: HealthStatus,
        probe_instant: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE services SET health_status = ?2, last_probe_at = ?3 WHERE id = ?1",
                params![
                    service_id,
                    verdict.as_str(),
                    format_ledger_timestamp(probe_instant)
                ],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("SERVICE"));
        }
        Ok(())
    }

    async fn apply_runtime_verdict(
        &self,
        service_id: i64,
        exit_code: Option<i64>,
        verdict: &CrashLoopVerdict,
    ) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE services SET last_exit_code = COALESCE(?2, last_exit_code), \
                     restart_count = ?3, restart_window_at = ?4, crash_looping = ?5, \
                     desired_state = ?6, container_id = NULL WHERE id = ?1",
                params![
                    service_id,
                    nullable_i64(exit_code),
                    verdict.restart_count,
                    nullable_timestamp(verdict.restart_window_at),
                    verdict.crash_looping as i64,
                    verdict.desired_state.as_str()
                ],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("SERVICE"));
        }
        Ok(())
    }

    // --- ESTRATO DE ENLACES (ARISTAS NO ORDENADAS) ---

    /// Enlaza dos servicios; la arista se normaliza (menor, mayor).
    #[instrument(skip(self))]
    pub async fn link(&self, service_id: i64, target_id: i64) -> Result<(), StoreError> {
        if service_id == target_id {
            return Err(StoreError::Validation(
                helmsman_domain_models::ValidationFault {
                    field: "service_link",
                    rule: "self-links are not legal".into(),
                },
            ));
        }
        let (lower_endpoint, upper_endpoint) = normalize_edge(service_id, target_id);

        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "INSERT OR IGNORE INTO service_links (service_id, target_id) VALUES (?1, ?2)",
                params![lower_endpoint, upper_endpoint],
            )
        })
        .await?;
        Ok(())
    }

    pub async fn unlink(&self, service_id: i64, target_id: i64) -> Result<(), StoreError> {
        let (lower_endpoint, upper_endpoint) = normalize_edge(service_id, target_id);
        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "DELETE FROM service_links WHERE service_id = ?1 AND target_id = ?2",
                params![lower_endpoint, upper_endpoint],
            )
        })
        .await?;
        Ok(())
    }

    /// Vecindario del servicio sobre el grafo no ordenado.
    pub async fn list_links(&self, service_id: i64) -> Result<Vec<i64>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT CASE WHEN service_id = ?1 THEN target_id ELSE service_id END
                 FROM service_links
                 WHERE service_id = ?1 OR target_id = ?1
                 ORDER BY 1 ASC",
                params![service_id],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut neighbor_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            neighbor_collection.push(column_i64(&data_row, 0)?);
        }
        Ok(neighbor_collection)
    }

}

fn normalize_edge(a: i64, b: i64) -> (i64, i64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn map_service_row(data_row: &Row) -> Result<Service, StoreError> {
    let env_json = column_text(data_row, 6)?;
    let ports_json = column_text(data_row, 7)?;
    let volumes_json = column_text(data_row, 8)?;

    let env: BTreeMap<String, String> =
        serde_json::from_str(&env_json).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let ports: Vec<PortBinding> =
        serde_json::from_str(&ports_json).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let volumes: Vec<VolumeBinding> =
        serde_json::from_str(&volumes_json).map_err(|e| StoreError::Mapping(e.to_string()))?;

    let desired_label = column_text(data_row, 11)?;
    let health_label = column_text(data_row, 16)?;

    Ok(Service {
        id: column_i64(data_row, 0)?,
        project_id: column_i64(data_row, 1)?,
        name: column_text(data_row, 2)?,
        description: column_opt_text(data_row, 3)?,
        image: column_text(data_row, 4)?,
        container_id: column_opt_text(data_row, 5)?,
        env,
        ports,
        volumes,
        registry_id: column_opt_i64(data_row, 9)?,
        health_path: column_opt_text(data_row, 10)?,
        desired_state: DesiredState::parse(&desired_label).ok_or_else(|| {
            StoreError::Mapping(format!("DESIRED_STATE_VIOLATION: {}", desired_label))
        })?,
        last_exit_code: column_opt_i64(data_row, 12)?,
        restart_count: column_i64(data_row, 13)?,
        restart_window_at: column_opt_timestamp(data_row, 14)?,
        crash_looping: column_bool(data_row, 15)?,
        health_status: HealthStatus::parse(&health_label).ok_or_else(|| {
            StoreError::Mapping(format!("HEALTH_STATUS_VIOLATION: {}", health_label))
        })?,
        last_probe_at: column_opt_timestamp(data_row, 17)?,
        created_at: column_timestamp(data_row, 18)?,
    })
}
