// [libs/domain/models/src/support.rs]
/*!
 * =================================================================
 * APARATO: SUPPORT ENTITY MODELS (V2.6 - NOMINAL SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE AJUSTES, REGISTROS, OAUTH Y PLANTILLAS
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. OPAQUE SETTINGS: El valor de un ajuste es un blob opaco; la bandera
 *    is_secret gobierna su redacción en vistas públicas.
 * 2. REGISTRY SHIELD: La contraseña de un registro persiste únicamente
 *    como (nonce, ciphertext) y jamás se emite hacia afuera.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Ajuste de plataforma con valor opaco.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    /// Bytes opacos; el plano de control no interpreta el contenido.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub value: Vec<u8>,
    pub is_secret: bool,
    pub updated_at: DateTime<Utc>,
}

/// Registro de imágenes privado; la contraseña vive cifrada en reposo.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub name: String,
    /// Endpoint del registro. Históricamente llamado `url`; el contrato
    /// actual lo nombra `server`.
    pub server: String,
    pub username: String,
    /// Material cifrado de la contraseña; excluido de vistas públicas.
    #[serde(skip_serializing)]
    pub password_nonce: Vec<u8>,
    #[serde(skip_serializing)]
    pub password_ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Estado transitorio del flujo OAuth; expira y se purga periódicamente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub state: String,
    pub redirect_uri: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OAuthState {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Plantilla de entorno reutilizable entre servicios.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvTemplate {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Variable individual de una plantilla de entorno.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvTemplateVariable {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    #[typeshare(serialized_as = "number")]
    pub template_id: i64,
    pub key: String,
    pub value: String,
}

/// Entrega de webhook recibida de un colaborador externo (GitHub).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub source: String,
    pub event: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
