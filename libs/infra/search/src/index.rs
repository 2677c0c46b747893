// INICIO DEL ARCHIVO [libs/infra/search/src/index.rs]
/*!
 * =================================================================
 * APARATO: SEARCH INDEX ENGINE (V7.0 - DUAL MODE SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ESPEJO FTS5, MODO BÁSICO Y CONSULTAS RANKEADAS
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. OPEN-TIME PROBE: La capacidad FTS5 se sondea al abrir; sin ella el
 *    índice opera en modo básico (LIKE ponderado, techo de 10 filas).
 * 2. TRIGGER COHERENCE: En modo FTS, triggers AI/AD/AU mantienen el
 *    espejo coherente con search_docs en la misma transacción.
 * 3. RANKING CONTRACT: FTS ordena por BM25 ASC y updated_at DESC;
 *    básico ordena por peso DESC y updated_at DESC.
 * =================================================================
 */

use crate::sanitize::sanitize_match_query;
use crate::score::{score_basic, ScorableDoc};
use chrono::Utc;
use helmsman_domain_models::{SearchDoc, SearchEntityType};
use helmsman_infra_db::mapping::{
    column_f64, column_i64, column_opt_i64, column_text, column_timestamp,
    format_ledger_timestamp, nullable_i64, nullable_text,
};
use helmsman_infra_db::{DbClient, StoreError};
use libsql::{params, Connection, Row, Value};
use tracing::{info, instrument, warn};

/// Techo de resultados en modo básico.
const BASIC_MODE_LIMIT_CAP: i64 = 10;

/// Longitud mínima de prefijo para sugerencias.
const SUGGEST_MIN_PREFIX: usize = 2;

/// Modo operativo del índice, resuelto al abrir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    FullText,
    Basic,
}

/// Filtro de consulta del índice.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub entity_type: Option<SearchEntityType>,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    /// Solo aplica cuando entity_type = Service; se compara contra tags.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub allow_basic: bool,
}

/// Resultado individual con su puntuación de ranking.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub doc: SearchDoc,
    pub score: f64,
}

/// Forma de entrada para upserts del índice.
#[derive(Debug, Clone)]
pub struct DocInput {
    pub entity_type: SearchEntityType,
    pub entity_id: i64,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub tags: String,
    pub project_id: Option<i64>,
    pub url_path: String,
}

/// Índice secundario sobre las tablas canónicas.
pub struct SearchIndex {
    database_client: DbClient,
    mode: IndexMode,
}

impl SearchIndex {
    /**
     * Abre el índice sondeando la capacidad FTS5 del motor.
     * Sin FTS5 el índice degrada a modo básico sin fallar.
     */
    #[instrument(skip(client))]
    pub async fn open(client: DbClient) -> Result<Self, StoreError> {
        let connection = client.connection().await?;

        let mode = match materialize_fts_mirror(&connection).await {
            Ok(()) => {
                info!("🔎 [SEARCH_ONLINE]: FTS5 mirror materialized (BM25 ranking).");
                IndexMode::FullText
            }
            Err(probe_fault) => {
                warn!(
                    "🔎 [SEARCH_DEGRADED]: FTS5 unavailable ({}); basic mode engaged.",
                    probe_fault
                );
                IndexMode::Basic
            }
        };

        Ok(Self {
            database_client: client,
            mode,
        })
    }

    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    pub(crate) fn client(&self) -> &DbClient {
        &self.database_client
    }

    /// Inserta o reemplaza el documento llaveado por (entity_type, entity_id).
    #[instrument(skip(self, input))]
    pub async fn upsert(&self, input: &DocInput) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        connection
            .execute(
                "INSERT INTO search_docs (entity_type, entity_id, title, subtitle, body, \
                     tags, project_id, url_path, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(entity_type, entity_id) DO UPDATE SET
                     title = excluded.title,
                     subtitle = excluded.subtitle,
                     body = excluded.body,
                     tags = excluded.tags,
                     project_id = excluded.project_id,
                     url_path = excluded.url_path,
                     updated_at = excluded.updated_at",
                params![
                    input.entity_type.as_str(),
                    input.entity_id,
                    input.title.clone(),
                    input.subtitle.clone(),
                    input.body.clone(),
                    input.tags.clone(),
                    nullable_i64(input.project_id),
                    input.url_path.clone(),
                    format_ledger_timestamp(Utc::now())
                ],
            )
            .await
            .map_err(StoreError::classify)?;
        Ok(())
    }

    /// Elimina la proyección de una entidad canónica.
    pub async fn delete_by_entity(
        &self,
        entity_type: SearchEntityType,
        entity_id: i64,
    ) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        connection
            .execute(
                "DELETE FROM search_docs WHERE entity_type = ?1 AND entity_id = ?2",
                params![entity_type.as_str(), entity_id],
            )
            .await
            .map_err(StoreError::classify)?;
        Ok(())
    }

    /**
     * Consulta rankeada. Retorna (hits, total).
     *
     * # Errors:
     * - `StoreError::PreconditionFailed`: modo básico sin allow_basic.
     */
    pub async fn query(
        &self,
        raw_query: &str,
        filter: &SearchFilter,
    ) -> Result<(Vec<SearchHit>, i64), StoreError> {
        match self.mode {
            IndexMode::FullText => self.query_full_text(raw_query, filter).await,
            IndexMode::Basic => {
                if !filter.allow_basic {
                    return Err(StoreError::PreconditionFailed(
                        "BASIC_MODE_NOT_PERMITTED: caller rejected the LIKE fallback".into(),
                    ));
                }
                self.query_basic(raw_query, filter).await
            }
        }
    }

    /**
     * Sugerencias de tipo-ahead ponderadas por título.
     * Prefijos de menos de 2 caracteres retornan vacío.
     */
    pub async fn suggest(
        &self,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<String>, StoreError> {
        if prefix.trim().chars().count() < SUGGEST_MIN_PREFIX {
            return Ok(Vec::new());
        }
        let effective_limit = limit.clamp(1, 20);

        match self.mode {
            IndexMode::FullText => {
                let match_expression = match sanitize_match_query(prefix) {
                    Some(expression) => expression,
                    None => return Ok(Vec::new()),
                };

                let connection = self.database_client.connection().await?;
                let mut query_results = connection
                    .query(
                        "SELECT d.title
                         FROM search_fts
                         JOIN search_docs d ON d.id = search_fts.rowid
                         WHERE search_fts MATCH ?1
                         ORDER BY bm25(search_fts, 5.0, 2.0, 1.0, 3.0) ASC, d.updated_at DESC
                         LIMIT ?2",
                        params![match_expression, effective_limit * 2],
                    )
                    .await
                    .map_err(StoreError::classify)?;

                // Deduplicación preservando el orden de ranking.
                let mut suggestion_collection: Vec<String> = Vec::new();
                while let Some(data_row) =
                    query_results.next().await.map_err(StoreError::classify)?
                {
                    let title = column_text(&data_row, 0)?;
                    if !suggestion_collection.contains(&title) {
                        suggestion_collection.push(title);
                    }
                    if suggestion_collection.len() as i64 >= effective_limit {
                        break;
                    }
                }
                Ok(suggestion_collection)
            }
            IndexMode::Basic => {
                let (hits, _) = self
                    .query_basic(
                        prefix,
                        &SearchFilter {
                            allow_basic: true,
                            limit: Some(effective_limit),
                            ..SearchFilter::default()
                        },
                    )
                    .await?;

                let mut suggestion_collection: Vec<String> =
                    hits.into_iter().map(|hit| hit.doc.title).collect();
                suggestion_collection.dedup();
                Ok(suggestion_collection)
            }
        }
    }

    // --- ESTRATO FTS ---

    async fn query_full_text(
        &self,
        raw_query: &str,
        filter: &SearchFilter,
    ) -> Result<(Vec<SearchHit>, i64), StoreError> {
        let connection = self.database_client.connection().await?;
        let (limit, offset) = effective_window(filter, i64::MAX);
        let filter_values = filter_params(filter);

        match sanitize_match_query(raw_query) {
            Some(match_expression) => {
                let hit_sql = format!(
                    "SELECT {columns}, bm25(search_fts) AS score
                     FROM search_fts
                     JOIN search_docs d ON d.id = search_fts.rowid
                     WHERE search_fts MATCH ?1 {filters}
                     ORDER BY score ASC, d.updated_at DESC
                     LIMIT ?6 OFFSET ?7",
                    columns = DOC_COLUMNS,
                    filters = FILTER_CLAUSES,
                );
                let total_sql = format!(
                    "SELECT COUNT(*)
                     FROM search_fts
                     JOIN search_docs d ON d.id = search_fts.rowid
                     WHERE search_fts MATCH ?1 {filters}",
                    filters = FILTER_CLAUSES,
                );

                let mut hit_rows = connection
                    .query(
                        hit_sql.as_str(),
                        params![
                            match_expression.clone(),
                            filter_values[0].clone(),
                            filter_values[1].clone(),
                            filter_values[2].clone(),
                            filter_values[3].clone(),
                            limit,
                            offset
                        ],
                    )
                    .await
                    .map_err(StoreError::classify)?;

                let mut hit_collection = Vec::new();
                while let Some(data_row) = hit_rows.next().await.map_err(StoreError::classify)? {
                    hit_collection.push(map_hit_row(&data_row, true)?);
                }

                let mut total_rows = connection
                    .query(
                        total_sql.as_str(),
                        params![
                            match_expression,
                            filter_values[0].clone(),
                            filter_values[1].clone(),
                            filter_values[2].clone(),
                            filter_values[3].clone()
                        ],
                    )
                    .await
                    .map_err(StoreError::classify)?;
                let total = match total_rows.next().await.map_err(StoreError::classify)? {
                    Some(data_row) => column_i64(&data_row, 0)?,
                    None => 0,
                };

                Ok((hit_collection, total))
            }
            None => self.list_match_all(&connection, filter, limit, offset).await,
        }
    }

    // --- ESTRATO BÁSICO ---

    async fn query_basic(
        &self,
        raw_query: &str,
        filter: &SearchFilter,
    ) -> Result<(Vec<SearchHit>, i64), StoreError> {
        let connection = self.database_client.connection().await?;
        let (limit, offset) = effective_window(filter, BASIC_MODE_LIMIT_CAP);

        if raw_query.trim().is_empty() {
            return self.list_match_all(&connection, filter, limit, offset).await;
        }

        // 1. CANDIDATOS FILTRADOS (sin MATCH; la puntuación vive en Rust)
        let candidate_sql = format!(
            "SELECT {columns}, 0.0 AS score
             FROM search_docs d
             WHERE 1 = 1 {filters}
             ORDER BY d.updated_at DESC",
            columns = DOC_COLUMNS,
            filters = FILTER_CLAUSES_OFFSET_ONE,
        );
        let filter_values = filter_params(filter);

        let mut candidate_rows = connection
            .query(
                candidate_sql.as_str(),
                params![
                    filter_values[0].clone(),
                    filter_values[1].clone(),
                    filter_values[2].clone(),
                    filter_values[3].clone()
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut scored_collection: Vec<SearchHit> = Vec::new();
        while let Some(data_row) = candidate_rows.next().await.map_err(StoreError::classify)? {
            let mut hit = map_hit_row(&data_row, false)?;
            let score = score_basic(
                &ScorableDoc {
                    title: &hit.doc.title,
                    subtitle: &hit.doc.subtitle,
                    body: &hit.doc.body,
                    tags: &hit.doc.tags,
                },
                raw_query,
            );
            if score > 0.0 {
                hit.score = score;
                scored_collection.push(hit);
            }
        }

        // 2. ORDEN: peso DESC, luego updated_at DESC (ya pre-ordenado).
        scored_collection.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| right.doc.updated_at.cmp(&left.doc.updated_at))
        });

        let total = scored_collection.len() as i64;
        let windowed: Vec<SearchHit> = scored_collection
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok((windowed, total))
    }

    /// Listado sin consulta: match-all ordenado por frescura.
    async fn list_match_all(
        &self,
        connection: &Connection,
        filter: &SearchFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SearchHit>, i64), StoreError> {
        let filter_values = filter_params(filter);
        let hit_sql = format!(
            "SELECT {columns}, 0.0 AS score
             FROM search_docs d
             WHERE 1 = 1 {filters}
             ORDER BY d.updated_at DESC, d.id DESC
             LIMIT ?5 OFFSET ?6",
            columns = DOC_COLUMNS,
            filters = FILTER_CLAUSES_OFFSET_ONE,
        );
        let total_sql = format!(
            "SELECT COUNT(*) FROM search_docs d WHERE 1 = 1 {filters}",
            filters = FILTER_CLAUSES_OFFSET_ONE,
        );

        let mut hit_rows = connection
            .query(
                hit_sql.as_str(),
                params![
                    filter_values[0].clone(),
                    filter_values[1].clone(),
                    filter_values[2].clone(),
                    filter_values[3].clone(),
                    limit,
                    offset
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut hit_collection = Vec::new();
        while let Some(data_row) = hit_rows.next().await.map_err(StoreError::classify)? {
            hit_collection.push(map_hit_row(&data_row, false)?);
        }

        let mut total_rows = connection
            .query(
                total_sql.as_str(),
                params![
                    filter_values[0].clone(),
                    filter_values[1].clone(),
                    filter_values[2].clone(),
                    filter_values[3].clone()
                ],
            )
            .await
            .map_err(StoreError::classify)?;
        let total = match total_rows.next().await.map_err(StoreError::classify)? {
            Some(data_row) => column_i64(&data_row, 0)?,
            None => 0,
        };

        Ok((hit_collection, total))
    }
}

/// Columnas canónicas del documento en el orden de mapeo.
const DOC_COLUMNS: &str = "d.id, d.entity_type, d.entity_id, d.title, d.subtitle, d.body, \
     d.tags, d.project_id, d.url_path, d.updated_at";

/// Cláusulas de filtro con placeholders ?2..?5 (MATCH ocupa ?1).
const FILTER_CLAUSES: &str = "
                       AND (?2 IS NULL OR d.entity_type = ?2)
                       AND (?3 IS NULL OR d.project_id = ?3)
                       AND (?4 IS NULL OR d.project_id IN (SELECT id FROM projects WHERE name = ?4))
                       AND (?5 IS NULL OR (' ' || d.tags || ' ') LIKE ('% ' || ?5 || ' %'))";

/// Cláusulas de filtro con placeholders ?1..?4 (sin MATCH).
const FILTER_CLAUSES_OFFSET_ONE: &str = "
                       AND (?1 IS NULL OR d.entity_type = ?1)
                       AND (?2 IS NULL OR d.project_id = ?2)
                       AND (?3 IS NULL OR d.project_id IN (SELECT id FROM projects WHERE name = ?3))
                       AND (?4 IS NULL OR (' ' || d.tags || ' ') LIKE ('% ' || ?4 || ' %'))";

/// Valores de filtro en el orden de las cláusulas.
fn filter_params(filter: &SearchFilter) -> [Value; 4] {
    // El filtro de estado solo aplica a documentos de servicio.
    let status_value = match (&filter.entity_type, &filter.status) {
        (Some(SearchEntityType::Service), Some(status)) => Some(status.clone()),
        _ => None,
    };

    [
        nullable_text(filter.entity_type.map(|t| t.as_str().to_string())),
        nullable_i64(filter.project_id),
        nullable_text(filter.project_name.clone()),
        nullable_text(status_value),
    ]
}

fn effective_window(filter: &SearchFilter, cap: i64) -> (i64, i64) {
    let limit = filter.limit.unwrap_or(20).clamp(1, 100).min(cap);
    let offset = filter.offset.unwrap_or(0).max(0);
    (limit, offset)
}

fn map_hit_row(data_row: &Row, with_score: bool) -> Result<SearchHit, StoreError> {
    let type_label = column_text(data_row, 1)?;
    let doc = SearchDoc {
        id: column_i64(data_row, 0)?,
        entity_type: SearchEntityType::parse(&type_label).ok_or_else(|| {
            StoreError::Mapping(format!("ENTITY_TYPE_VIOLATION: {}", type_label))
        })?,
        entity_id: column_i64(data_row, 2)?,
        title: column_text(data_row, 3)?,
        subtitle: column_text(data_row, 4)?,
        body: column_text(data_row, 5)?,
        tags: column_text(data_row, 6)?,
        project_id: column_opt_i64(data_row, 7)?,
        url_path: column_text(data_row, 8)?,
        updated_at: column_timestamp(data_row, 9)?,
    };

    let score = if with_score {
        column_f64(data_row, 10)?
    } else {
        0.0
    };
    Ok(SearchHit { doc, score })
}

/// Materializa el espejo FTS5 y sus triggers de coherencia.
async fn materialize_fts_mirror(connection: &Connection) -> Result<(), StoreError> {
    connection
        .execute(
            "CREATE VIRTUAL TABLE IF NOT EXISTS search_fts USING fts5( \
                 title, subtitle, body, tags, \
                 content='search_docs', content_rowid='id')",
            (),
        )
        .await
        .map_err(StoreError::classify)?;

    for trigger_statement in [
        "CREATE TRIGGER IF NOT EXISTS search_docs_ai AFTER INSERT ON search_docs BEGIN
             INSERT INTO search_fts(rowid, title, subtitle, body, tags)
             VALUES (new.id, new.title, new.subtitle, new.body, new.tags);
         END",
        "CREATE TRIGGER IF NOT EXISTS search_docs_ad AFTER DELETE ON search_docs BEGIN
             INSERT INTO search_fts(search_fts, rowid, title, subtitle, body, tags)
             VALUES ('delete', old.id, old.title, old.subtitle, old.body, old.tags);
         END",
        "CREATE TRIGGER IF NOT EXISTS search_docs_au AFTER UPDATE ON search_docs BEGIN
             INSERT INTO search_fts(search_fts, rowid, title, subtitle, body, tags)
             VALUES ('delete', old.id, old.title, old.subtitle, old.body, old.tags);
             INSERT INTO search_fts(rowid, title, subtitle, body, tags)
             VALUES (new.id, new.title, new.subtitle, new.body, new.tags);
         END",
    ] {
        connection
            .execute(trigger_statement, ())
            .await
            .map_err(StoreError::classify)?;
    }

    // Reconstrucción del espejo desde la tabla de contenido: cubre filas
    // insertadas antes de la materialización de los triggers.
    connection
        .execute("INSERT INTO search_fts(search_fts) VALUES ('rebuild')", ())
        .await
        .map_err(StoreError::classify)?;

    Ok(())
}

// FIN DEL ARCHIVO [libs/infra/search/src/index.rs]
