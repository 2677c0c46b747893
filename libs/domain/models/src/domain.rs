// [libs/domain/models/src/domain.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN OWNERSHIP MODEL (V3.5 - FSM HARDENED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: MÁQUINA DE ESTADOS DE VERIFICACIÓN DE PROPIEDAD
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. CLOSED TRANSITIONS: Únicamente los cinco valores catalogados son
 *    aceptados; cualquier literal externo colapsa en la frontera.
 * 2. TOKEN GENESIS: Cada dominio nace con un token de verificación de
 *    32 hex (16 bytes de entropía del SO).
 * =================================================================
 */

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Estado del ciclo de verificación de propiedad.
/// Transiciones: pending → verifying → {verified → active} | error.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Pending,
    Verifying,
    Verified,
    Active,
    Error,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Pending => "pending",
            DomainStatus::Verifying => "verifying",
            DomainStatus::Verified => "verified",
            DomainStatus::Active => "active",
            DomainStatus::Error => "error",
        }
    }

    /// Frontera cerrada: solo los cinco valores legales son aceptados.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(DomainStatus::Pending),
            "verifying" => Some(DomainStatus::Verifying),
            "verified" => Some(DomainStatus::Verified),
            "active" => Some(DomainStatus::Active),
            "error" => Some(DomainStatus::Error),
            _ => None,
        }
    }
}

/// Método de desafío de una tentativa de verificación.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationMethod {
    A,
    CNAME,
    TXT,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::A => "A",
            VerificationMethod::CNAME => "CNAME",
            VerificationMethod::TXT => "TXT",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "A" => Some(VerificationMethod::A),
            "CNAME" => Some(VerificationMethod::CNAME),
            "TXT" => Some(VerificationMethod::TXT),
            _ => None,
        }
    }
}

/// Estado de una tentativa individual de verificación.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Failed => "failed",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(VerificationStatus::Pending),
            "verified" => Some(VerificationStatus::Verified),
            "failed" => Some(VerificationStatus::Failed),
            _ => None,
        }
    }
}

/// Nombre bajo control del operador, con su máquina de verificación.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    /// Nombre único del dominio.
    pub name: String,
    pub status: DomainStatus,
    /// Proveedor DNS opcional (adaptador externo).
    pub provider: Option<String>,
    pub zone_id: Option<String>,
    /// Token aleatorio de 32 hex generado en la creación.
    pub verification_token: String,
    pub verification_checked_at: Option<DateTime<Utc>>,
    #[typeshare(serialized_as = "number")]
    pub certificate_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Domain {
    /// Genera el token de verificación: 16 bytes de entropía → 32 hex.
    pub fn generate_verification_token() -> String {
        let mut entropy_buffer = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut entropy_buffer);
        hex::encode(entropy_buffer)
    }
}

/// Tentativa individual de verificación ejecutada por colaboradores DNS/HTTP.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainVerification {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    #[typeshare(serialized_as = "number")]
    pub domain_id: i64,
    pub method: VerificationMethod,
    /// Cadena de desafío plantada en el DNS o servida por HTTP.
    pub challenge: String,
    pub status: VerificationStatus,
    pub checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
