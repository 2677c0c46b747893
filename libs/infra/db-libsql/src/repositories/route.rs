// [libs/infra/db-libsql/src/repositories/route.rs]
/*!
 * =================================================================
 * APARATO: ROUTE REPOSITORY (V5.4 - RENDER INPUT SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE RUTAS Y ENTRADAS DEL PIPELINE
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. DIRTY SIGNALING: Toda mutación de ruta enciende la bandera del
 *    pipeline de proxy tras el commit.
 * 2. DETERMINISTIC ORDER: get_all_routes y las entradas de render emiten
 *    orden total (dominio ASC, path ASC).
 * 3. DANGLING CERT TOLERANCE: certificate_id no porta FK; el pipeline
 *    degrada referencias colgantes a "sin certificado".
 * =================================================================
 */

use crate::client::{retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_bool, column_i64, column_opt_i64, column_opt_text, column_text, column_timestamp,
    format_ledger_timestamp, nullable_i64, nullable_text,
};
use crate::signals::{EventBridge, IndexJob};
use chrono::Utc;
use helmsman_domain_models::{Route, SearchEntityType};
use libsql::{params, Row};
use tracing::{info, instrument};

const ROUTE_COLUMNS: &str = "id, service_id, domain, port, tls, path, certificate_id, \
     domain_id, proxy_config, created_at, updated_at";

/// Fila del join rutas × servicios × proyectos consumida por el render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInput {
    pub domain: String,
    pub path: Option<String>,
    pub port: i64,
    pub tls: bool,
    pub certificate_id: Option<i64>,
    pub proxy_config: Option<String>,
    pub service_id: i64,
    pub service_name: String,
    pub project_name: String,
    pub network_name: String,
}

/// Repositorio de autoridad única para rutas de exposición externa.
pub struct RouteRepository {
    database_client: DbClient,
    event_bridge: EventBridge,
}

impl RouteRepository {
    pub fn new(client: DbClient, bridge: EventBridge) -> Self {
        Self {
            database_client: client,
            event_bridge: bridge,
        }
    }

    /**
     * Registra una ruta para un servicio.
     *
     * # Errors:
     * - `StoreError::Validation`: dominio o puerto fuera de frontera.
     * - `StoreError::Conflict`: par (servicio, dominio) duplicado.
     */
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        service_id: i64,
        domain: &str,
        port: i64,
        tls: bool,
        path: Option<String>,
        certificate_id: Option<i64>,
        domain_id: Option<i64>,
        proxy_config: Option<String>,
    ) -> Result<Route, StoreError> {
        Route::validate_shape(domain, port)?;

        let sealed_at = format_ledger_timestamp(Utc::now());
        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO routes (service_id, domain, port, tls, path, certificate_id, \
                     domain_id, proxy_config, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                 RETURNING id",
                params![
                    service_id,
                    domain,
                    port,
                    tls as i64,
                    nullable_text(path),
                    nullable_i64(certificate_id),
                    nullable_i64(domain_id),
                    nullable_text(proxy_config),
                    sealed_at
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("ROUTE"))?;
        let route_id = column_i64(&identity_row, 0)?;

        info!("🌐 [ROUTE_SEALED]: {} -> service {} port {}.", domain, service_id, port);

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Route,
            entity_id: route_id,
        });
        self.event_bridge.mark_proxy_dirty();

        self.get(route_id).await
    }

    pub async fn get(&self, route_id: i64) -> Result<Route, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM routes WHERE id = ?1", ROUTE_COLUMNS),
                params![route_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_route_row(&data_row),
            None => Err(StoreError::NotFound("ROUTE")),
        }
    }

    pub async fn list_by_service(&self, service_id: i64) -> Result<Vec<Route>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM routes WHERE service_id = ?1
                     ORDER BY domain ASC, COALESCE(path, '') ASC",
                    ROUTE_COLUMNS
                ),
                params![service_id],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut route_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            route_collection.push(map_route_row(&data_row)?);
        }
        Ok(route_collection)
    }

    /// Orden total del catálogo de rutas: dominio ASC, luego path ASC.
    pub async fn get_all_routes(&self) -> Result<Vec<Route>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM routes ORDER BY domain ASC, COALESCE(path, '') ASC",
                    ROUTE_COLUMNS
                ),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut route_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            route_collection.push(map_route_row(&data_row)?);
        }
        Ok(route_collection)
    }

    /// Actualiza los campos mutables y sella updated_at.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        route_id: i64,
        port: i64,
        tls: bool,
        path: Option<String>,
        certificate_id: Option<i64>,
        proxy_config: Option<String>,
    ) -> Result<Route, StoreError> {
        let current = self.get(route_id).await?;
        Route::validate_shape(&current.domain, port)?;

        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "UPDATE routes SET port = ?2, tls = ?3, path = ?4, certificate_id = ?5, \
                     proxy_config = ?6, updated_at = ?7 WHERE id = ?1",
                params![
                    route_id,
                    port,
                    tls as i64,
                    nullable_text(path.clone()),
                    nullable_i64(certificate_id),
                    nullable_text(proxy_config.clone()),
                    format_ledger_timestamp(Utc::now())
                ],
            )
        })
        .await?;

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Route,
            entity_id: route_id,
        });
        self.event_bridge.mark_proxy_dirty();

        self.get(route_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, route_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute("DELETE FROM routes WHERE id = ?1", params![route_id])
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("ROUTE"));
        }

        self.event_bridge.schedule_index(IndexJob::Delete {
            entity_type: SearchEntityType::Route,
            entity_id: route_id,
        });
        self.event_bridge.mark_proxy_dirty();
        Ok(())
    }

    /**
     * Join determinista rutas × servicios × proyectos para el render.
     * El orden total (dominio, path) es parte del contrato de determinismo.
     */
    pub async fn render_inputs(&self) -> Result<Vec<RenderInput>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT r.domain, r.path, r.port, r.tls, r.certificate_id, r.proxy_config, \
                        s.id, s.name, p.name, p.network_name
                 FROM routes r
                 JOIN services s ON r.service_id = s.id
                 JOIN projects p ON s.project_id = p.id
                 ORDER BY r.domain ASC, COALESCE(r.path, '') ASC",
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut input_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            input_collection.push(RenderInput {
                domain: column_text(&data_row, 0)?,
                path: column_opt_text(&data_row, 1)?,
                port: column_i64(&data_row, 2)?,
                tls: column_bool(&data_row, 3)?,
                certificate_id: column_opt_i64(&data_row, 4)?,
                proxy_config: column_opt_text(&data_row, 5)?,
                service_id: column_i64(&data_row, 6)?,
                service_name: column_text(&data_row, 7)?,
                project_name: column_text(&data_row, 8)?,
                network_name: column_text(&data_row, 9)?,
            });
        }
        Ok(input_collection)
    }
}

fn map_route_row(data_row: &Row) -> Result<Route, StoreError> {
    Ok(Route {
        id: column_i64(data_row, 0)?,
        service_id: column_i64(data_row, 1)?,
        domain: column_text(data_row, 2)?,
        port: column_i64(data_row, 3)?,
        tls: column_bool(data_row, 4)?,
        path: column_opt_text(data_row, 5)?,
        certificate_id: column_opt_i64(data_row, 6)?,
        domain_id: column_opt_i64(data_row, 7)?,
        proxy_config: column_opt_text(data_row, 8)?,
        created_at: column_timestamp(data_row, 9)?,
        updated_at: column_timestamp(data_row, 10)?,
    })
}
