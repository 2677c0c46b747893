// [libs/domain/models/src/env_var.rs]
/*!
 * =================================================================
 * APARATO: ENV VAR DOMAIN MODEL (V3.0 - XOR HARDENED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE VARIABLE DE ENTORNO CON SECRETO XOR
 *
 * # Mathematical Proof (Secret Exclusivity):
 * El invariante is_secret ⇔ (|ciphertext| > 0 ∧ |nonce| > 0 ∧ value = "")
 * se valida como función pura antes de todo commit; una fila jamás puede
 * portar simultáneamente plaintext y ciphertext.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::validation::{validate_env_key, ValidationFault, ValidationResult};

/// Variable de entorno de un servicio; exactamente una de las dos formas:
/// plaintext (`value`) o material cifrado (`nonce` + `ciphertext`).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    #[typeshare(serialized_as = "number")]
    pub service_id: i64,
    /// Llave única dentro del servicio.
    pub key: String,
    pub is_secret: bool,
    /// Forma plaintext; vacía cuando la variable es secreta.
    pub value: String,
    /// Nonce GCM; presente solo en la forma secreta.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub nonce: Vec<u8>,
    /// Material cifrado; presente solo en la forma secreta.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ciphertext: Vec<u8>,
}

impl EnvVar {
    /**
     * Valida el invariante XOR de la frontera de datos junto a la llave.
     *
     * # Errors:
     * `ValidationFault` cuando la llave es vacía, cuando una variable
     * secreta carece de nonce/ciphertext o arrastra plaintext, o cuando
     * una variable plana arrastra material cifrado.
     */
    pub fn validate_shape(
        key: &str,
        value: &str,
        is_secret: bool,
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> ValidationResult {
        validate_env_key(key)?;

        let violation = |rule: &str| {
            Err(ValidationFault {
                field: "env_var",
                rule: rule.into(),
            })
        };

        if is_secret {
            if nonce.is_empty() || ciphertext.is_empty() {
                return violation("secret form requires nonce and ciphertext");
            }
            if !value.is_empty() {
                return violation("secret form cannot carry plaintext value");
            }
        } else {
            if !nonce.is_empty() || !ciphertext.is_empty() {
                return violation("plain form cannot carry cipher material");
            }
        }
        Ok(())
    }
}
