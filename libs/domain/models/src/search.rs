// [libs/domain/models/src/search.rs]
/*!
 * =================================================================
 * APARATO: SEARCH PROJECTION MODEL (V3.0 - NOMINAL SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE PROYECCIÓN HACIA EL ÍNDICE SECUNDARIO
 *
 * # Mathematical Proof (Projection Fidelity):
 * El documento está llaveado por (entity_type, entity_id); para cada
 * entidad canónica existe exactamente una proyección tras reindex(), y
 * el índice jamás actúa como fuente de verdad.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Clase de entidad canónica proyectada en el índice.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchEntityType {
    Project,
    Service,
    Route,
    Setting,
    Registry,
    EnvTemplate,
    Page,
    Help,
    Operation,
}

impl SearchEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEntityType::Project => "project",
            SearchEntityType::Service => "service",
            SearchEntityType::Route => "route",
            SearchEntityType::Setting => "setting",
            SearchEntityType::Registry => "registry",
            SearchEntityType::EnvTemplate => "env_template",
            SearchEntityType::Page => "page",
            SearchEntityType::Help => "help",
            SearchEntityType::Operation => "operation",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "project" => Some(SearchEntityType::Project),
            "service" => Some(SearchEntityType::Service),
            "route" => Some(SearchEntityType::Route),
            "setting" => Some(SearchEntityType::Setting),
            "registry" => Some(SearchEntityType::Registry),
            "env_template" => Some(SearchEntityType::EnvTemplate),
            "page" => Some(SearchEntityType::Page),
            "help" => Some(SearchEntityType::Help),
            "operation" => Some(SearchEntityType::Operation),
            _ => None,
        }
    }
}

/// Proyección denormalizada de una entidad canónica.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchDoc {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub entity_type: SearchEntityType,
    #[typeshare(serialized_as = "number")]
    pub entity_id: i64,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    /// Etiquetas separadas por espacio (incluye el estado del servicio).
    pub tags: String,
    #[typeshare(serialized_as = "number")]
    pub project_id: Option<i64>,
    /// Ruta navegable del dashboard (prefijo /app/).
    pub url_path: String,
    pub updated_at: DateTime<Utc>,
}
