// [libs/infra/search/src/reindex.rs]
/*!
 * =================================================================
 * APARATO: REINDEX ENGINE (V4.0 - POINT-IN-TIME REBUILD)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: RECONSTRUCCIÓN TRANSACCIONAL TOTAL DEL ÍNDICE
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. SINGLE TRANSACTION: Purga total + re-derivación de cada categoría
 *    (proyectos, servicios, rutas, registros, plantillas, páginas,
 *    ayuda, operaciones) en una transacción; cualquier fallo aborta.
 * 2. CANONICAL TRUTH: Cada documento se deriva por SELECT directo de las
 *    tablas canónicas; el índice jamás se auto-alimenta.
 * 3. INCREMENTAL REPAIR: refresh_entity re-deriva una sola entidad para
 *    el consumidor de la cola post-commit.
 * =================================================================
 */

use crate::catalog::{help_documents, operations, static_pages};
use crate::index::{DocInput, SearchIndex};
use chrono::Utc;
use helmsman_domain_models::SearchEntityType;
use helmsman_infra_db::client::begin_write;
use helmsman_infra_db::mapping::format_ledger_timestamp;
use helmsman_infra_db::StoreError;
use libsql::{params, Transaction};
use tracing::{info, instrument};

/// Columnas de inserción de la proyección.
const INSERT_COLUMNS: &str =
    "entity_type, entity_id, title, subtitle, body, tags, project_id, url_path, updated_at";

impl SearchIndex {
    /**
     * Reconstrucción total punto-en-tiempo del índice.
     *
     * Tras el commit, para cada entidad canónica existe exactamente un
     * documento con su llave (entity_type, entity_id).
     */
    #[instrument(skip(self))]
    pub async fn reindex(&self) -> Result<u64, StoreError> {
        let connection = self.client().connection().await?;
        let rebuild_transaction = begin_write(&connection).await?;
        let sealed_at = format_ledger_timestamp(Utc::now());

        // 1. PURGA TOTAL DE LA PROYECCIÓN
        rebuild_transaction
            .execute("DELETE FROM search_docs", ())
            .await
            .map_err(StoreError::classify)?;

        // 2. RE-DERIVACIÓN POR CATEGORÍA (cada SELECT es independiente)
        let mut projected_rows: u64 = 0;

        for derivation_sql in [
            // Proyectos
            format!(
                "INSERT INTO search_docs ({columns})
                 SELECT 'project', p.id, p.name, 'Project',
                        TRIM(COALESCE(p.repo_url, '') || ' ' || p.branch),
                        'project', p.id, '/app/projects/' || p.id, ?1
                 FROM projects p",
                columns = INSERT_COLUMNS
            ),
            // Servicios (la descripción forma parte del cuerpo indexado)
            format!(
                "INSERT INTO search_docs ({columns})
                 SELECT 'service', s.id, s.name, p.name,
                        TRIM(s.image || ' ' || COALESCE(s.description, '')),
                        'service ' || s.desired_state || ' ' || s.health_status,
                        s.project_id, '/app/services/' || s.id, ?1
                 FROM services s JOIN projects p ON p.id = s.project_id",
                columns = INSERT_COLUMNS
            ),
            // Rutas
            format!(
                "INSERT INTO search_docs ({columns})
                 SELECT 'route', r.id, r.domain, s.name,
                        TRIM(r.domain || ' ' || COALESCE(r.path, '') || ' port ' || r.port),
                        'route' || CASE WHEN r.tls = 1 THEN ' tls' ELSE '' END,
                        s.project_id, '/app/routes/' || r.id, ?1
                 FROM routes r JOIN services s ON s.id = r.service_id",
                columns = INSERT_COLUMNS
            ),
            // Registros de imágenes
            format!(
                "INSERT INTO search_docs ({columns})
                 SELECT 'registry', g.id, g.name, g.server,
                        TRIM(g.name || ' ' || g.server),
                        'registry', NULL, '/app/registries/' || g.id, ?1
                 FROM registries g",
                columns = INSERT_COLUMNS
            ),
            // Plantillas de entorno
            format!(
                "INSERT INTO search_docs ({columns})
                 SELECT 'env_template', t.id, t.name, 'Environment template',
                        COALESCE(t.description, ''),
                        'env_template', NULL, '/app/templates/' || t.id, ?1
                 FROM env_templates t",
                columns = INSERT_COLUMNS
            ),
        ] {
            projected_rows += rebuild_transaction
                .execute(derivation_sql.as_str(), params![sealed_at.clone()])
                .await
                .map_err(StoreError::classify)?;
        }

        // 3. CATÁLOGOS EMBEBIDOS (páginas, operaciones, ayuda)
        projected_rows += seed_catalogs(&rebuild_transaction, &sealed_at).await?;

        rebuild_transaction
            .commit()
            .await
            .map_err(StoreError::classify)?;

        info!("🔎 [REINDEX_SEALED]: {} documents projected point-in-time.", projected_rows);
        Ok(projected_rows)
    }

    /**
     * Reparación incremental: re-deriva una única entidad canónica.
     * Si la fila canónica ya no existe, la proyección se elimina.
     */
    pub async fn refresh_entity(
        &self,
        entity_type: SearchEntityType,
        entity_id: i64,
    ) -> Result<(), StoreError> {
        let derivation_sql = match entity_type {
            SearchEntityType::Project => {
                "SELECT p.name, 'Project',
                        TRIM(COALESCE(p.repo_url, '') || ' ' || p.branch),
                        'project', p.id, '/app/projects/' || p.id
                 FROM projects p WHERE p.id = ?1"
            }
            SearchEntityType::Service => {
                "SELECT s.name, p.name,
                        TRIM(s.image || ' ' || COALESCE(s.description, '')),
                        'service ' || s.desired_state || ' ' || s.health_status,
                        s.project_id, '/app/services/' || s.id
                 FROM services s JOIN projects p ON p.id = s.project_id WHERE s.id = ?1"
            }
            SearchEntityType::Route => {
                "SELECT r.domain, s.name,
                        TRIM(r.domain || ' ' || COALESCE(r.path, '') || ' port ' || r.port),
                        'route' || CASE WHEN r.tls = 1 THEN ' tls' ELSE '' END,
                        s.project_id, '/app/routes/' || r.id
                 FROM routes r JOIN services s ON s.id = r.service_id WHERE r.id = ?1"
            }
            SearchEntityType::Registry => {
                "SELECT g.name, g.server, TRIM(g.name || ' ' || g.server),
                        'registry', NULL, '/app/registries/' || g.id
                 FROM registries g WHERE g.id = ?1"
            }
            SearchEntityType::EnvTemplate => {
                "SELECT t.name, 'Environment template', COALESCE(t.description, ''),
                        'env_template', NULL, '/app/templates/' || t.id
                 FROM env_templates t WHERE t.id = ?1"
            }
            // Los catálogos embebidos solo mutan en reindex().
            _ => return Ok(()),
        };

        let connection = self.client().connection().await?;
        let mut derivation_rows = connection
            .query(derivation_sql, params![entity_id])
            .await
            .map_err(StoreError::classify)?;

        match derivation_rows.next().await.map_err(StoreError::classify)? {
            Some(data_row) => {
                let input = DocInput {
                    entity_type,
                    entity_id,
                    title: helmsman_infra_db::mapping::column_text(&data_row, 0)?,
                    subtitle: helmsman_infra_db::mapping::column_text(&data_row, 1)?,
                    body: helmsman_infra_db::mapping::column_text(&data_row, 2)?,
                    tags: helmsman_infra_db::mapping::column_text(&data_row, 3)?,
                    project_id: helmsman_infra_db::mapping::column_opt_i64(&data_row, 4)?,
                    url_path: helmsman_infra_db::mapping::column_text(&data_row, 5)?,
                };
                self.upsert(&input).await
            }
            None => self.delete_by_entity(entity_type, entity_id).await,
        }
    }
}

/// Siembra los catálogos embebidos dentro de la transacción de rebuild.
async fn seed_catalogs(
    rebuild_transaction: &Transaction,
    sealed_at: &str,
) -> Result<u64, StoreError> {
    let mut seeded_rows: u64 = 0;

    for page in static_pages() {
        seeded_rows += rebuild_transaction
            .execute(
                &format!(
                    "INSERT INTO search_docs ({columns})
                     VALUES ('page', ?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)",
                    columns = INSERT_COLUMNS
                ),
                params![
                    page.entity_id,
                    page.title,
                    page.subtitle,
                    page.body.clone(),
                    page.tags.clone(),
                    page.url_path,
                    sealed_at
                ],
            )
            .await
            .map_err(StoreError::classify)?;
    }

    for operation in operations() {
        seeded_rows += rebuild_transaction
            .execute(
                &format!(
                    "INSERT INTO search_docs ({columns})
                     VALUES ('operation', ?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)",
                    columns = INSERT_COLUMNS
                ),
                params![
                    operation.entity_id,
                    operation.title,
                    operation.subtitle,
                    operation.body.clone(),
                    operation.tags.clone(),
                    operation.url_path,
                    sealed_at
                ],
            )
            .await
            .map_err(StoreError::classify)?;
    }

    for help_document in help_documents() {
        seeded_rows += rebuild_transaction
            .execute(
                &format!(
                    "INSERT INTO search_docs ({columns})
                     VALUES ('help', ?1, ?2, 'Help', ?3, ?4, NULL, ?5, ?6)",
                    columns = INSERT_COLUMNS
                ),
                params![
                    help_document.entity_id,
                    help_document.title.clone(),
                    help_document.body.clone(),
                    help_document.tags.clone(),
                    format!("/app/help/{}", help_document.slug),
                    sealed_at
                ],
            )
            .await
            .map_err(StoreError::classify)?;
    }

    Ok(seeded_rows)
}
