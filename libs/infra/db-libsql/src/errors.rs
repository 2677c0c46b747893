// [libs/infra/db-libsql/src/errors.rs]
/*!
 * =================================================================
 * APARATO: STORE ERROR CATALOG (V4.2 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. TAXONOMY PARITY: Cada variante mapea una política de recuperación
 *    (retry acotado, superficie al llamador o aborto limpio).
 * 2. SECRET DISCIPLINE: Ningún mensaje arrastra SQL crudo con valores ni
 *    material sensible; los textos portan códigos de estrato.
 * =================================================================
 */

use helmsman_core_vault::VaultError;
use helmsman_domain_models::validation::ValidationFault;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// La entrada viola una restricción de frontera; el Ledger no fue tocado.
    #[error("[L3_STORE_VALIDATION_FAULT]: {0}")]
    Validation(#[from] ValidationFault),

    /// No existe fila para la llave solicitada.
    #[error("[L3_STORE_FAULT]: {0}_NOT_FOUND")]
    NotFound(&'static str),

    /// Violación de restricción de unicidad (nombre/dominio duplicado).
    #[error("[L3_STORE_CONFLICT]: {0}")]
    Conflict(String),

    /// Transición de máquina de estados rechazada.
    #[error("[L3_STORE_PRECONDITION_FAULT]: {0}")]
    PreconditionFailed(String),

    /// El tag de autenticidad GCM colapsó al descifrar material en reposo.
    #[error("[L3_STORE_CRYPTO_FAULT]: DECRYPTION_FAILED")]
    DecryptionFailed,

    /// La llave maestra del proceso no está disponible.
    #[error("[L3_STORE_CRYPTO_FAULT]: MASTER_KEY_UNAVAILABLE -> {0}")]
    MasterKeyUnavailable(String),

    /// Contención WAL agotó el presupuesto de reintentos (≤3 / ≤100ms).
    #[error("[L3_STORE_TRANSIENT_FAULT]: ENGINE_BUSY -> {0}")]
    TransientStorage(String),

    /// Un colaborador externo (Docker/ACME/DNS/proxy) falló.
    #[error("[L4_COLLABORATOR_FAULT]: {0}")]
    Collaborator(String),

    /// El contexto fue cancelado; el trabajo se abandonó limpiamente.
    #[error("[L3_STORE_FAULT]: CANCELLED")]
    Cancelled,

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_STORE_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    Query(String),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_STORE_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    Mapping(String),
}

impl From<VaultError> for StoreError {
    fn from(fault: VaultError) -> Self {
        match fault {
            VaultError::DecryptionFailed | VaultError::MalformedNonce => {
                StoreError::DecryptionFailed
            }
            VaultError::MasterKeyUnavailable(detail) => StoreError::MasterKeyUnavailable(detail),
        }
    }
}

impl StoreError {
    /// Clasifica un fallo del motor libSQL según la política de recuperación.
    pub fn classify(engine_fault: libsql::Error) -> Self {
        let message = engine_fault.to_string();
        if message.contains("UNIQUE constraint failed") {
            return StoreError::Conflict(message);
        }
        if is_busy_signature(&message) {
            return StoreError::TransientStorage(message);
        }
        StoreError::Query(message)
    }
}

/// Firma textual de contención WAL del motor.
pub fn is_busy_signature(message: &str) -> bool {
    message.contains("database is locked") || message.contains("database table is locked")
}
