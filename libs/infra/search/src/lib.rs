// [libs/infra/search/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SEARCH ACCESS MATRIX (V4.0 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PUNTO ÚNICO DE ACCESO AL ÍNDICE SECUNDARIO
 * =================================================================
 */

/// Catálogos embebidos (páginas, operaciones, ayuda) y destilador markdown.
pub mod catalog;
/// Motor dual del índice (FTS5 / básico) y consultas rankeadas.
pub mod index;
/// Reconstrucción transaccional y reparación incremental.
pub mod reindex;
/// Traducción segura de entrada libre a sintaxis MATCH.
pub mod sanitize;
/// Puntuación ponderada del modo básico.
pub mod score;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use index::{DocInput, IndexMode, SearchFilter, SearchHit, SearchIndex};
