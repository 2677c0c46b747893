// [libs/infra/db-libsql/src/repositories/env_var.rs]
/*!
 * =================================================================
 * APARATO: ENV VAR REPOSITORY (V4.2 - XOR & BATCH SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE VARIABLES CON INVARIANTE XOR
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. XOR AT THE GATE: Toda forma se valida como función pura antes de
 *    tocar el Ledger; una violación jamás produce escritura parcial.
 * 2. ATOMIC BATCHES: BulkSet y BulkDelete ejecutan en una transacción;
 *    el fallo de cualquier elemento revierte el lote completo.
 * 3. IN-MEMORY RESOLUTION: Los secretos se descifran únicamente al
 *    resolver el entorno para la especificación del contenedor.
 * =================================================================
 */

use crate::client::{begin_write, retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{column_blob, column_bool, column_i64, column_text, nullable_blob};
use helmsman_core_vault as vault;
use helmsman_domain_models::EnvVar;
use libsql::{params, Row};
use std::collections::BTreeMap;
use tracing::instrument;

/// Forma de entrada de una variable (plaintext XOR material cifrado).
#[derive(Debug, Clone)]
pub struct EnvVarInput {
    pub key: String,
    pub value: String,
    pub is_secret: bool,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl EnvVarInput {
    /// Forma plaintext.
    pub fn plain(key: &str, value: &str) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_secret: false,
            nonce: Vec::new(),
            ciphertext: Vec::new(),
        }
    }

    /// Forma secreta ya cifrada.
    pub fn secret(key: &str, nonce: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            is_secret: true,
            nonce,
            ciphertext,
        }
    }

    /// Cifra un plaintext bajo la llave maestra y construye la forma secreta.
    pub fn seal_secret(key: &str, plaintext: &str) -> Result<Self, StoreError> {
        let master_key = vault::master_key()?;
        let (nonce, ciphertext) = vault::encrypt(&master_key, plaintext.as_bytes());
        Ok(Self::secret(key, nonce, ciphertext))
    }
}

/// Repositorio de autoridad única para variables de entorno gestionadas.
pub struct EnvVarRepository {
    database_client: DbClient,
}

impl EnvVarRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /**
     * Inserta o reemplaza una variable (llave única por servicio).
     *
     * # Errors:
     * - `StoreError::Validation`: violación del invariante XOR.
     */
    #[instrument(skip(self, input))]
    pub async fn set(&self, service_id: i64, input: EnvVarInput) -> Result<(), StoreError> {
        EnvVar::validate_shape(
            &input.key,
            &input.value,
            input.is_secret,
            &input.nonce,
            &input.ciphertext,
        )?;

        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "INSERT INTO env_vars (service_id, key, is_secret, value, nonce, ciphertext)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(service_id, key) DO UPDATE SET
                     is_secret = excluded.is_secret,
                     value = excluded.value,
                     nonce = excluded.nonce,
                     ciphertext = excluded.ciphertext",
                params![
                    service_id,
                    input.key.clone(),
                    input.is_secret as i64,
                    input.value.clone(),
                    nullable_blob(&input.nonce),
                    nullable_blob(&input.ciphertext)
                ],
            )
        })
        .await?;
        Ok(())
    }

    /**
     * Fija un lote de variables en una única transacción.
     * Cualquier violación de forma revierte el lote completo.
     */
    #[instrument(skip(self, batch))]
    pub async fn bulk_set(
        &self,
        service_id: i64,
        batch: Vec<EnvVarInput>,
    ) -> Result<(), StoreError> {
        // 1. VALIDACIÓN TOTAL PREVIA: Ninguna escritura antes del veredicto.
        for input in &batch {
            EnvVar::validate_shape(
                &input.key,
                &input.value,
                input.is_secret,
                &input.nonce,
                &input.ciphertext,
            )?;
        }

        // 2. APLICACIÓN ATÓMICA DEL LOTE
        let connection = self.database_client.connection().await?;
        let batch_transaction = begin_write(&connection).await?;

        for input in &batch {
            batch_transaction
                .execute(
                    "INSERT INTO env_vars (service_id, key, is_secret, value, nonce, ciphertext)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(service_id, key) DO UPDATE SET
                         is_secret = excluded.is_secret,
                         value = excluded.value,
                         nonce = excluded.nonce,
                         ciphertext = excluded.ciphertext",
                    params![
                        service_id,
                        input.key.clone(),
                        input.is_secret as i64,
                        input.value.clone(),
                        nullable_blob(&input.nonce),
                        nullable_blob(&input.ciphertext)
                    ],
                )
                .await
                .map_err(StoreError::classify)?;
        }

        batch_transaction
            .commit()
            .await
            .map_err(StoreError::classify)?;
        Ok(())
    }

    /// Elimina un lote de llaves en una única transacción.
    #[instrument(skip(self, keys))]
    pub async fn bulk_delete(&self, service_id: i64, keys: Vec<String>) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let batch_transaction = begin_write(&connection).await?;

        for key in &keys {
            batch_transaction
                .execute(
                    "DELETE FROM env_vars WHERE service_id = ?1 AND key = ?2",
                    params![service_id, key.clone()],
                )
                .await
                .map_err(StoreError::classify)?;
        }

        batch_transaction
            .commit()
            .await
            .map_err(StoreError::classify)?;
        Ok(())
    }

    pub async fn delete(&self, service_id: i64, key: &str) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "DELETE FROM env_vars WHERE service_id = ?1 AND key = ?2",
                params![service_id, key],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("ENV_VAR"));
        }
        Ok(())
    }

    /// Variables del servicio ordenadas por llave; los secretos viajan cifrados.
    pub async fn list(&self, service_id: i64) -> Result<Vec<EnvVar>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT id, service_id, key, is_secret, value, nonce, ciphertext
                 FROM env_vars WHERE service_id = ?1 ORDER BY key ASC",
                params![service_id],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut variable_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            variable_collection.push(map_env_var_row(&data_row)?);
        }
        Ok(variable_collection)
    }

    /**
     * Resuelve el entorno efectivo del servicio para el adaptador Docker.
     * Los secretos se descifran bajo la llave maestra; el plaintext vive
     * únicamente en la memoria del proceso.
     */
    pub async fn resolved_env(
        &self,
        service_id: i64,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let variable_collection = self.list(service_id).await?;
        let mut resolved_environment = BTreeMap::new();

        for variable in variable_collection {
            if variable.is_secret {
                let master_key = vault::master_key()?;
                let plaintext_bytes =
                    vault::decrypt(&master_key, &variable.nonce, &variable.ciphertext)?;
                let plaintext = String::from_utf8(plaintext_bytes)
                    .map_err(|_| StoreError::DecryptionFailed)?;
                resolved_environment.insert(variable.key, plaintext);
            } else {
                resolved_environment.insert(variable.key, variable.value);
            }
        }
        Ok(resolved_environment)
    }
}

fn map_env_var_row(data_row: &Row) -> Result<EnvVar, StoreError> {
    Ok(EnvVar {
        id: column_i64(data_row, 0)?,
        service_id: column_i64(data_row, 1)?,
        key: column_text(data_row, 2)?,
        is_secret: column_bool(data_row, 3)?,
        value: column_text(data_row, 4)?,
        nonce: column_blob(data_row, 5)?,
        ciphertext: column_blob(data_row, 6)?,
    })
}
