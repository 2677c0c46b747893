// [libs/domain/models/src/certificate.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICATE DOMAIN MODEL (V4.0 - ENHANCED SHAPE)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO X.509 CON LLAVE CIFRADA EN REPOSO
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. DUAL SHAPE: La forma legada (cert_data/key_data) y la forma
 *    enriquecida (issuer, not_before, not_after, pem_chain, status)
 *    coexisten sobre la misma fila.
 * 2. AT-REST DISCIPLINE: key_data persiste exclusivamente como
 *    (nonce, ciphertext); el plaintext vive solo en memoria.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Procedencia del material X.509.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CertificateType {
    Uploaded,
    Acme,
}

impl CertificateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::Uploaded => "uploaded",
            CertificateType::Acme => "acme",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "uploaded" => Some(CertificateType::Uploaded),
            "acme" => Some(CertificateType::Acme),
            _ => None,
        }
    }
}

/// Estado operativo de la forma enriquecida.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Active,
    Expired,
    Failed,
    Pending,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Active => "active",
            CertificateStatus::Expired => "expired",
            CertificateStatus::Failed => "failed",
            CertificateStatus::Pending => "pending",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "active" => Some(CertificateStatus::Active),
            "expired" => Some(CertificateStatus::Expired),
            "failed" => Some(CertificateStatus::Failed),
            "pending" => Some(CertificateStatus::Pending),
            _ => None,
        }
    }
}

/// Material X.509 para un dominio; la llave privada jamás viaja en claro
/// fuera de la memoria del proceso.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub domain: String,
    pub cert_type: CertificateType,
    /// PEM público; opcional mientras una emisión ACME está pendiente.
    pub cert_data: Option<String>,
    /// Llave privada descifrada en memoria; None en vistas públicas.
    #[serde(skip_serializing)]
    pub key_data: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    // --- FORMA ENRIQUECIDA ---
    pub issuer: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub status: CertificateStatus,
    pub pem_chain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    /// Un certificado enriquecido se reporta vencido cuando not_after < now.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.not_after.map(|edge| edge < now).unwrap_or(false)
            || self.expires_at.map(|edge| edge < now).unwrap_or(false)
    }

    /// Estado efectivo reportado hacia afuera, degradando a Expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> CertificateStatus {
        if self.is_expired(now) {
            CertificateStatus::Expired
        } else {
            self.status
        }
    }
}
