// INICIO DEL ARCHIVO [libs/core/vault/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN VAULT ENGINE (V3.4 - GOLD MASTER)
 * CLASIFICACIÓN: CORE SECURITY (ESTRATO L1)
 * RESPONSABILIDAD: CIFRADO EN REPOSO AES-256-GCM Y LLAVE MAESTRA
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. AT-REST SHIELD: Todo material sensible (llaves privadas X.509,
 *    contraseñas de registro, variables secretas) atraviesa este motor
 *    antes de tocar el Ledger.
 * 2. KEY LIFECYCLE: La llave maestra se hidrata una sola vez desde el
 *    entorno y vive tras un cerrojo de lectura; los lectores reciben
 *    copias defensivas, jamás la referencia viva.
 * 3. REDACTION PROTOCOL: Las vistas públicas reciben únicamente la
 *    longitud y la huella SHA-256 truncada del material.
 *
 * # Mathematical Proof (AEAD Integrity):
 * AES-256-GCM con nonce de 96 bits y tag de 128 bits garantiza que
 * cualquier mutación del ciphertext o del nonce colapse la verificación
 * de autenticidad, haciendo imposible el descifrado parcial.
 * =================================================================
 */

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use once_cell::sync::Lazy;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::RwLock;
use thiserror::Error;

/// Variable de entorno que transporta la llave maestra (base64, 32 bytes).
pub const MASTER_KEY_ENVIRONMENT_VARIABLE: &str = "HELMSMAN_MASTER_KEY";

/// Longitud física de la llave AES-256.
pub const MASTER_KEY_LENGTH_BYTES: usize = 32;

/// Longitud del nonce GCM (96 bits).
pub const NONCE_LENGTH_BYTES: usize = 12;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VaultError {
    /// La verificación del tag de autenticidad GCM colapsó.
    #[error("[L1_VAULT_FAULT]: DECRYPTION_INTEGRITY_COLLAPSE")]
    DecryptionFailed,

    /// La llave maestra no está definida o es estructuralmente inválida.
    #[error("[L1_VAULT_FAULT]: MASTER_KEY_UNAVAILABLE -> {0}")]
    MasterKeyUnavailable(String),

    /// El nonce recibido no mide 96 bits.
    #[error("[L1_VAULT_FAULT]: NONCE_GEOMETRY_VIOLATION")]
    MalformedNonce,
}

/// Celda de proceso para la llave maestra hidratada.
static MASTER_KEY_CELL: Lazy<RwLock<Option<[u8; MASTER_KEY_LENGTH_BYTES]>>> =
    Lazy::new(|| RwLock::new(None));

/**
 * Cifra un plaintext bajo la llave dada con un nonce aleatorio de 96 bits.
 *
 * Retorna el par (nonce, ciphertext); el ciphertext incluye el tag GCM.
 */
pub fn encrypt(key: &[u8; MASTER_KEY_LENGTH_BYTES], plaintext: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let cipher_engine = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_buffer = [0u8; NONCE_LENGTH_BYTES];
    rand::thread_rng().fill_bytes(&mut nonce_buffer);
    let nonce = Nonce::from_slice(&nonce_buffer);

    // El sellado GCM solo falla ante geometrías imposibles de buffer, que el
    // tipo de la llave ya excluye.
    let ciphertext = cipher_engine
        .encrypt(nonce, plaintext)
        .expect("AES-GCM seal over valid key geometry");

    (nonce_buffer.to_vec(), ciphertext)
}

/**
 * Descifra un par (nonce, ciphertext) verificando el tag de autenticidad.
 *
 * # Errors:
 * - `VaultError::MalformedNonce`: El nonce no mide 96 bits.
 * - `VaultError::DecryptionFailed`: Tag inválido, llave incorrecta o
 *   ciphertext mutado.
 */
pub fn decrypt(
    key: &[u8; MASTER_KEY_LENGTH_BYTES],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    if nonce.len() != NONCE_LENGTH_BYTES {
        return Err(VaultError::MalformedNonce);
    }

    let cipher_engine = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher_engine
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::DecryptionFailed)
}

/**
 * Recupera la llave maestra del proceso, hidratándola perezosamente.
 *
 * La primera invocación decodifica HELMSMAN_MASTER_KEY (base64 → 32 bytes)
 * y la sella en la celda de proceso. Las siguientes lecturas retornan una
 * copia defensiva sin tocar el entorno.
 *
 * # Errors:
 * - `VaultError::MasterKeyUnavailable`: Variable ausente, base64 corrupto o
 *   longitud distinta de 32 bytes. El fallo no envenena la celda; un intento
 *   posterior con el entorno reparado vuelve a hidratar.
 */
pub fn master_key() -> Result<[u8; MASTER_KEY_LENGTH_BYTES], VaultError> {
    // 1. LECTURA RÁPIDA (Camino caliente sin contención de escritura)
    if let Some(cached_key) = *MASTER_KEY_CELL.read().expect("master key cell poisoned") {
        return Ok(cached_key);
    }

    // 2. HIDRATACIÓN DESDE EL ENTORNO (Una sola vez por proceso)
    let encoded_material = std::env::var(MASTER_KEY_ENVIRONMENT_VARIABLE)
        .map_err(|_| VaultError::MasterKeyUnavailable("ENV_VOID".into()))?;

    let decoded_material = BASE64
        .decode(encoded_material.trim())
        .map_err(|_| VaultError::MasterKeyUnavailable("BASE64_CORRUPTION".into()))?;

    let key_buffer: [u8; MASTER_KEY_LENGTH_BYTES] = decoded_material
        .try_into()
        .map_err(|_| VaultError::MasterKeyUnavailable("KEY_GEOMETRY_VIOLATION".into()))?;

    let mut writable_cell = MASTER_KEY_CELL.write().expect("master key cell poisoned");
    *writable_cell = Some(key_buffer);

    Ok(key_buffer)
}

/**
 * Inyecta una llave maestra explícita en la celda de proceso.
 *
 * Utilizado por el Proving Grounds y por escenarios de arranque donde la
 * llave llega por un canal distinto al entorno.
 */
pub fn install_master_key(key: [u8; MASTER_KEY_LENGTH_BYTES]) {
    let mut writable_cell = MASTER_KEY_CELL.write().expect("master key cell poisoned");
    *writable_cell = Some(key);
}

/// Genera una llave maestra aleatoria de 32 bytes (entropía del SO).
pub fn generate_master_key() -> [u8; MASTER_KEY_LENGTH_BYTES] {
    let mut key_buffer = [0u8; MASTER_KEY_LENGTH_BYTES];
    rand::thread_rng().fill_bytes(&mut key_buffer);
    key_buffer
}

/**
 * Redacta material sensible para vistas públicas de la API.
 *
 * Emite `[REDACTED: length=L, fingerprint=<hex>]` donde la huella son los
 * primeros 8 bytes del SHA-256 del material. El plaintext jamás viaja.
 */
pub fn redact(sensitive_material: &[u8]) -> String {
    let mut fingerprint_hasher = Sha256::new();
    fingerprint_hasher.update(sensitive_material);
    let digest = fingerprint_hasher.finalize();

    format!(
        "[REDACTED: length={}, fingerprint={}]",
        sensitive_material.len(),
        hex::encode(&digest[..8])
    )
}

// FIN DEL ARCHIVO [libs/core/vault/src/lib.rs]
