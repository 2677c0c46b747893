// [libs/domain/models/src/route.rs]
/*!
 * =================================================================
 * APARATO: ROUTE DOMAIN MODEL (V3.2 - NOMINAL SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE EXPOSICIÓN EXTERNA (dominio[, path] -> puerto)
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::validation::{validate_domain_name, validate_port, ValidationResult};

/// Mapeo externamente alcanzable de (dominio[, path]) hacia un puerto de
/// servicio, opcionalmente terminado en TLS.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    #[typeshare(serialized_as = "number")]
    pub service_id: i64,
    /// Dominio público (1–253 caracteres); único por servicio.
    pub domain: String,
    /// Puerto interno del servicio que recibe el tráfico.
    #[typeshare(serialized_as = "number")]
    pub port: i64,
    pub tls: bool,
    /// Prefijo de ruta opcional; None expone la raíz.
    pub path: Option<String>,
    /// Certificado referenciado; puede apuntar a una fila ya purgada y el
    /// pipeline lo degrada a "sin certificado" sin fallar el render.
    #[typeshare(serialized_as = "number")]
    pub certificate_id: Option<i64>,
    #[typeshare(serialized_as = "number")]
    pub domain_id: Option<i64>,
    /// Fragmento opaco de configuración inyectado por el operador.
    pub proxy_config: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    /// Valida la frontera del par dominio/puerto.
    pub fn validate_shape(domain: &str, port: i64) -> ValidationResult {
        validate_domain_name(domain)?;
        validate_port(port)?;
        Ok(())
    }
}
