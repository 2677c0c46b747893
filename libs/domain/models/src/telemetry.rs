// [libs/domain/models/src/telemetry.rs]
/*!
 * =================================================================
 * APARATO: AUDIT & TELEMETRY MODELS (V2.4 - NOMINAL SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE AUDITORÍA APPEND-ONLY Y MÉTRICAS
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Entrada inmutable del rastro de auditoría.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// Identidad que ejecutó la acción (token o usuario).
    pub actor: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    /// Metadatos arbitrarios serializados como JSON.
    pub meta: serde_json::Value,
}

/// Muestra puntual de métricas del host.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSample {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    #[typeshare(serialized_as = "number")]
    pub memory_used_bytes: i64,
    #[typeshare(serialized_as = "number")]
    pub memory_total_bytes: i64,
    #[typeshare(serialized_as = "number")]
    pub disk_used_bytes: i64,
    #[typeshare(serialized_as = "number")]
    pub disk_total_bytes: i64,
    #[typeshare(serialized_as = "number")]
    pub net_rx_bytes: i64,
    #[typeshare(serialized_as = "number")]
    pub net_tx_bytes: i64,
}
