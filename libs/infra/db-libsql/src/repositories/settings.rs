// [libs/infra/db-libsql/src/repositories/settings.rs]
/*!
 * =================================================================
 * APARATO: SETTINGS & REGISTRY REPOSITORY (V4.4 - OPAQUE SHIELD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: AJUSTES OPACOS, REGISTROS PRIVADOS Y ESTADOS OAUTH
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. OPAQUE VALUES: El valor de un ajuste es un blob que el plano de
 *    control jamás interpreta; is_secret gobierna su redacción.
 * 2. REGISTRY SHIELD: La contraseña persiste como (nonce, ciphertext);
 *    la vista pública nunca la emite, el accessor la descifra en memoria.
 * 3. EXPIRING STATES: Los estados OAuth portan expiración dura y se
 *    purgan por el daemon de retención.
 * =================================================================
 */

use crate::client::{retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_blob, column_bool, column_i64, column_opt_text, column_text, column_timestamp,
    format_ledger_timestamp, nullable_blob, nullable_text,
};
use crate::signals::{EventBridge, IndexJob};
use chrono::{DateTime, Duration, Utc};
use helmsman_core_vault as vault;
use helmsman_domain_models::{OAuthState, Registry, SearchEntityType, Setting};
use libsql::{params, Row};
use tracing::{info, instrument};

// --- ESTRATO DE AJUSTES ---

/// Repositorio de ajustes de plataforma con valor opaco.
pub struct SettingsRepository {
    database_client: DbClient,
}

impl SettingsRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Fija (o reemplaza) un ajuste.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: &[u8], is_secret: bool) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::Validation(
                helmsman_domain_models::ValidationFault {
                    field: "setting.key",
                    rule: "key must be non-empty".into(),
                },
            ));
        }

        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "INSERT INTO settings (key, value, is_secret, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     is_secret = excluded.is_secret,
                     updated_at = excluded.updated_at",
                params![
                    key,
                    value.to_vec(),
                    is_secret as i64,
                    format_ledger_timestamp(Utc::now())
                ],
            )
        })
        .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Setting, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT key, value, is_secret, updated_at FROM settings WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_setting_row(&data_row, true),
            None => Err(StoreError::NotFound("SETTING")),
        }
    }

    /// Listado público: los valores secretos viajan vacíos.
    pub async fn list_public(&self) -> Result<Vec<Setting>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT key, value, is_secret, updated_at FROM settings ORDER BY key ASC",
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut setting_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            setting_collection.push(map_setting_row(&data_row, false)?);
        }
        Ok(setting_collection)
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute("DELETE FROM settings WHERE key = ?1", params![key])
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("SETTING"));
        }
        Ok(())
    }
}

fn map_setting_row(data_row: &Row, include_secret_value: bool) -> Result<Setting, StoreError> {
    let is_secret = column_bool(data_row, 2)?;
    let raw_value = column_blob(data_row, 1)?;

    Ok(Setting {
        key: column_text(data_row, 0)?,
        value: if is_secret && !include_secret_value {
            Vec::new()
        } else {
            raw_value
        },
        is_secret,
        updated_at: column_timestamp(data_row, 3)?,
    })
}

// --- ESTRATO DE REGISTROS DE IMÁGENES ---

const REGISTRY_COLUMNS: &str =
    "id, name, server, username, password_nonce, password_ciphertext, created_at, updated_at";

/// Repositorio de registros de imágenes privados.
pub struct RegistryRepository {
    database_client: DbClient,
    event_bridge: EventBridge,
}

impl RegistryRepository {
    pub fn new(client: DbClient, bridge: EventBridge) -> Self {
        Self {
            database_client: client,
            event_bridge: bridge,
        }
    }

    /**
     * Registra un registro privado cifrando la contraseña en reposo.
     *
     * # Errors:
     * - `StoreError::Conflict`: nombre duplicado.
     */
    #[instrument(skip(self, password_plain))]
    pub async fn create(
        &self,
        name: &str,
        server: &str,
        username: &str,
        password_plain: &str,
    ) -> Result<Registry, StoreError> {
        if name.is_empty() || server.is_empty() {
            return Err(StoreError::Validation(
                helmsman_domain_models::ValidationFault {
                    field: "registry",
                    rule: "name and server must be non-empty".into(),
                },
            ));
        }

        let master_key = vault::master_key()?;
        let (password_nonce, password_ciphertext) =
            vault::encrypt(&master_key, password_plain.as_bytes());

        let sealed_at = format_ledger_timestamp(Utc::now());
        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO registries (name, server, username, password_nonce, \
                     password_ciphertext, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 RETURNING id",
                params![name, server, username, password_nonce, password_ciphertext, sealed_at],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("REGISTRY"))?;
        let registry_id = column_i64(&identity_row, 0)?;

        info!("📦 [REGISTRY_SEALED]: '{}' credentials encrypted at rest.", name);
        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Registry,
            entity_id: registry_id,
        });

        self.get(registry_id).await
    }

    /// Vista pública: el material de contraseña jamás viaja.
    pub async fn get(&self, registry_id: i64) -> Result<Registry, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM registries WHERE id = ?1", REGISTRY_COLUMNS),
                params![registry_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_registry_row(&data_row),
            None => Err(StoreError::NotFound("REGISTRY")),
        }
    }

    pub async fn list(&self) -> Result<Vec<Registry>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM registries ORDER BY name ASC", REGISTRY_COLUMNS),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut registry_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            registry_collection.push(map_registry_row(&data_row)?);
        }
        Ok(registry_collection)
    }

    /**
     * Credenciales descifradas en memoria para el adaptador Docker.
     * Retorna (username, password_plaintext).
     */
    pub async fn credentials(&self, registry_id: i64) -> Result<(String, String), StoreError> {
        let registry = self.get(registry_id).await?;

        if registry.password_nonce.is_empty() || registry.password_ciphertext.is_empty() {
            return Ok((registry.username, String::new()));
        }

        let master_key = vault::master_key()?;
        let plaintext_bytes = vault::decrypt(
            &master_key,
            &registry.password_nonce,
            &registry.password_ciphertext,
        )?;
        let password =
            String::from_utf8(plaintext_bytes).map_err(|_| StoreError::DecryptionFailed)?;
        Ok((registry.username, password))
    }

    /// Actualiza el endpoint y, si llega, re-cifra la contraseña.
    #[instrument(skip(self, password_plain))]
    pub async fn update(
        &self,
        registry_id: i64,
        server: &str,
        username: &str,
        password_plain: Option<&str>,
    ) -> Result<Registry, StoreError> {
        let connection = self.database_client.connection().await?;

        match password_plain {
            Some(new_password) => {
                let master_key = vault::master_key()?;
                let (password_nonce, password_ciphertext) =
                    vault::encrypt(&master_key, new_password.as_bytes());

                retry_busy(|| {
                    connection.execute(
                        "UPDATE registries SET server = ?2, username = ?3, password_nonce = ?4, \
                             password_ciphertext = ?5, updated_at = ?6 WHERE id = ?1",
                        params![
                            registry_id,
                            server,
                            username,
                            nullable_blob(&password_nonce),
                            nullable_blob(&password_ciphertext),
                            format_ledger_timestamp(Utc::now())
                        ],
                    )
                })
                .await?
            }
            None => {
                retry_busy(|| {
                    connection.execute(
                        "UPDATE registries SET server = ?2, username = ?3, updated_at = ?4 \
                         WHERE id = ?1",
                        params![
                            registry_id,
                            server,
                            username,
                            format_ledger_timestamp(Utc::now())
                        ],
                    )
                })
                .await?
            }
        };

        self.event_bridge.schedule_index(IndexJob::Upsert {
            entity_type: SearchEntityType::Registry,
            entity_id: registry_id,
        });

        self.get(registry_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, registry_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute("DELETE FROM registries WHERE id = ?1", params![registry_id])
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("REGISTRY"));
        }

        self.event_bridge.schedule_index(IndexJob::Delete {
            entity_type: SearchEntityType::Registry,
            entity_id: registry_id,
        });
        Ok(())
    }
}

fn map_registry_row(data_row: &Row) -> Result<Registry, StoreError> {
    Ok(Registry {
        id: column_i64(data_row, 0)?,
        name: column_text(data_row, 1)?,
        server: column_text(data_row, 2)?,
        username: column_text(data_row, 3)?,
        password_nonce: column_blob(data_row, 4)?,
        password_ciphertext: column_blob(data_row, 5)?,
        created_at: column_timestamp(data_row, 6)?,
        updated_at: column_timestamp(data_row, 7)?,
    })
}

// --- ESTRATO DE ESTADOS OAUTH ---

/// Repositorio de estados transitorios del flujo OAuth.
pub struct OAuthStateRepository {
    database_client: DbClient,
}

impl OAuthStateRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Sella un estado con ventana de vida acotada.
    pub async fn create(
        &self,
        state: &str,
        redirect_uri: Option<String>,
        time_to_live_seconds: i64,
    ) -> Result<OAuthState, StoreError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(time_to_live_seconds);

        let connection = self.database_client.connection().await?;
        connection
            .execute(
                "INSERT INTO oauth_states (state, redirect_uri, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    state,
                    nullable_text(redirect_uri.clone()),
                    format_ledger_timestamp(expires_at),
                    format_ledger_timestamp(now)
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        Ok(OAuthState {
            state: state.to_string(),
            redirect_uri,
            expires_at,
            created_at: now,
        })
    }

    /**
     * Consume un estado: lo retorna y elimina si sigue vigente.
     *
     * # Errors:
     * - `StoreError::NotFound`: inexistente o ya vencido (el vencido se purga).
     */
    pub async fn consume(
        &self,
        state: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthState, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT state, redirect_uri, expires_at, created_at FROM oauth_states WHERE state = ?1",
                params![state],
            )
            .await
            .map_err(StoreError::classify)?;

        let data_row = query_results
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("OAUTH_STATE"))?;

        let found = OAuthState {
            state: column_text(&data_row, 0)?,
            redirect_uri: column_opt_text(&data_row, 1)?,
            expires_at: column_timestamp(&data_row, 2)?,
            created_at: column_timestamp(&data_row, 3)?,
        };
        drop(query_results);

        connection
            .execute("DELETE FROM oauth_states WHERE state = ?1", params![state])
            .await
            .map_err(StoreError::classify)?;

        if found.is_expired(now) {
            return Err(StoreError::NotFound("OAUTH_STATE"));
        }
        Ok(found)
    }

    /// Purga estados vencidos; retorna la cantidad incinerada.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let connection = self.database_client.connection().await?;
        let purged_rows = connection
            .execute(
                "DELETE FROM oauth_states WHERE expires_at < ?1",
                params![format_ledger_timestamp(now)],
            )
            .await
            .map_err(StoreError::classify)?;
        Ok(purged_rows)
    }
}
