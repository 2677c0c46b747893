// [libs/domain/models/src/project.rs]
/*!
 * =================================================================
 * APARATO: PROJECT DOMAIN MODEL (V3.1 - NOMINAL SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE AGRUPACIÓN DE SERVICIOS Y RED PRIVADA
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Agrupación soberana de servicios que comparten una red de contenedores.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    /// Nombre único del proyecto (1–64 caracteres).
    pub name: String,
    /// Origen git opcional para despliegues automatizados.
    pub repo_url: Option<String>,
    /// Rama de despliegue; `main` cuando el operador no especifica otra.
    pub branch: String,
    /// Referencia de imagen objetivo para builds externos.
    pub image_target: Option<String>,
    /// Nombre derivado de la red privada: `proj_<id>`.
    pub network_name: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Rama por defecto cuando la mutación de creación omite el campo.
    pub const DEFAULT_BRANCH: &'static str = "main";

    /// Deriva el nombre canónico de red privada para un identificador.
    pub fn derive_network_name(project_id: i64) -> String {
        format!("proj_{}", project_id)
    }
}
