// [libs/domain/models/src/proxy.rs]
/*!
 * =================================================================
 * APARATO: PROXY SNAPSHOT MODEL (V2.1 - NOMINAL SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE SNAPSHOT INMUTABLE DE CONFIGURACIÓN
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Configuración renderizada del proxy inverso, sellada con su hash de
/// contenido. Invariante del Ledger: a lo sumo una fila activa.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfigSnapshot {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    /// SHA-256 hex del texto de configuración.
    pub config_hash: String,
    pub config_content: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
