// [libs/infra/db-libsql/src/repositories/identity.rs]
/*!
 * =================================================================
 * APARATO: IDENTITY REPOSITORY (V5.0 - PBKDF2 GOVERNANCE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA DE TOKENS DE API Y USUARIOS
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. HASH DISCIPLINE: El secreto del token se sella como cadena PHC
 *    (PBKDF2-HMAC-SHA256); el plaintext jamás persiste ni se registra.
 * 2. ADMIN GATE: Únicamente un actor admin emite tokens.
 * 3. VERIFY SWEEP: verify() itera los hashes almacenados y retorna el
 *    primer nombre coincidente; touch() sella last_used_at.
 * =================================================================
 */

use crate::client::{retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_i64, column_opt_text, column_opt_timestamp, column_text, column_timestamp,
    format_ledger_timestamp, nullable_text,
};
use chrono::Utc;
use helmsman_domain_models::validation::validate_token_name;
use helmsman_domain_models::{Client, Role, Token, User};
use libsql::{params, Row};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand::RngCore;
use tracing::{info, instrument, warn};

const TOKEN_COLUMNS: &str = "id, name, secret_hash, role, created_at, last_used_at";
const USER_COLUMNS: &str = "id, login, display_name, avatar_url, role, created_at, last_seen_at";

/// Repositorio de autoridad única para tokens de API.
pub struct TokenRepository {
    database_client: DbClient,
}

impl TokenRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /**
     * Emite un token con secreto sellado vía PBKDF2.
     *
     * # Errors:
     * - `StoreError::PreconditionFailed`: el actor no es admin.
     * - `StoreError::Validation`: nombre fuera de 1..=64 o rol ilegal.
     * - `StoreError::Conflict`: nombre duplicado.
     */
    #[instrument(skip(self, plain_secret))]
    pub async fn create(
        &self,
        actor_role: Role,
        name: &str,
        plain_secret: &str,
        role_label: &str,
    ) -> Result<Token, StoreError> {
        if !actor_role.can_issue_tokens() {
            return Err(StoreError::PreconditionFailed(
                "TOKEN_EMISSION_DENIED: admin authority required".into(),
            ));
        }
        validate_token_name(name)?;
        let role = Role::parse(role_label).ok_or_else(|| {
            StoreError::Validation(helmsman_domain_models::ValidationFault {
                field: "token.role",
                rule: format!("'{}' is outside the legal catalog", role_label),
            })
        })?;
        if plain_secret.is_empty() {
            return Err(StoreError::Validation(
                helmsman_domain_models::ValidationFault {
                    field: "token.secret",
                    rule: "secret must be non-empty".into(),
                },
            ));
        }

        let secret_hash = seal_secret(plain_secret)?;

        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO tokens (name, secret_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                params![
                    name,
                    secret_hash,
                    role.as_str(),
                    format_ledger_timestamp(Utc::now())
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("TOKEN"))?;
        let token_id = column_i64(&identity_row, 0)?;

        info!("🔑 [TOKEN_SEALED]: '{}' issued with role {}.", name, role.as_str());
        self.get(token_id).await
    }

    pub async fn get(&self, token_id: i64) -> Result<Token, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM tokens WHERE id = ?1", TOKEN_COLUMNS),
                params![token_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_token_row(&data_row),
            None => Err(StoreError::NotFound("TOKEN")),
        }
    }

    pub async fn list(&self) -> Result<Vec<Token>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM tokens ORDER BY name ASC", TOKEN_COLUMNS),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut token_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            token_collection.push(map_token_row(&data_row)?);
        }
        Ok(token_collection)
    }

    /**
     * Verifica un secreto plano contra todos los hashes almacenados.
     * Retorna el nombre del primer token coincidente.
     *
     * # Errors:
     * - `StoreError::NotFound("TOKEN")`: ningún hash coincide (token inválido).
     */
    pub async fn verify(&self, plain_secret: &str) -> Result<String, StoreError> {
        let token_collection = self.list().await?;

        for token in token_collection {
            let parsed_hash = match PasswordHash::new(&token.secret_hash) {
                Ok(hash) => hash,
                Err(_) => {
                    warn!("⚠️ [HASH_SHAPE_FAULT]: Token '{}' carries a malformed PHC string.", token.name);
                    continue;
                }
            };
            if Pbkdf2
                .verify_password(plain_secret.as_bytes(), &parsed_hash)
                .is_ok()
            {
                return Ok(token.name);
            }
        }
        Err(StoreError::NotFound("TOKEN"))
    }

    /// Sella last_used_at del token nominal.
    pub async fn touch(&self, name: &str) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE tokens SET last_used_at = ?2 WHERE name = ?1",
                params![name, format_ledger_timestamp(Utc::now())],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("TOKEN"));
        }
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute("DELETE FROM tokens WHERE name = ?1", params![name])
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("TOKEN"));
        }
        Ok(())
    }
}

/// Sella un secreto como cadena PHC PBKDF2-HMAC-SHA256.
fn seal_secret(plain_secret: &str) -> Result<String, StoreError> {
    let mut salt_entropy = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_entropy);
    let salt = SaltString::encode_b64(&salt_entropy)
        .map_err(|e| StoreError::Mapping(format!("SALT_GEOMETRY_VIOLATION: {}", e)))?;

    Pbkdf2
        .hash_password(plain_secret.as_bytes(), &salt)
        .map(|sealed| sealed.to_string())
        .map_err(|e| StoreError::Mapping(format!("HASH_ENGINE_FAULT: {}", e)))
}

fn map_token_row(data_row: &Row) -> Result<Token, StoreError> {
    let role_label = column_text(data_row, 3)?;
    Ok(Token {
        id: column_i64(data_row, 0)?,
        name: column_text(data_row, 1)?,
        secret_hash: column_text(data_row, 2)?,
        role: Role::parse(&role_label)
            .ok_or_else(|| StoreError::Mapping(format!("ROLE_VIOLATION: {}", role_label)))?,
        created_at: column_timestamp(data_row, 4)?,
        last_used_at: column_opt_timestamp(data_row, 5)?,
    })
}

/// Repositorio de usuarios del dashboard (alta vía OAuth).
pub struct UserRepository {
    database_client: DbClient,
}

impl UserRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Alta o refresco de un usuario autenticado externamente.
    #[instrument(skip(self))]
    pub async fn upsert(
        &self,
        login: &str,
        display_name: Option<String>,
        avatar_url: Option<String>,
        role: Role,
    ) -> Result<User, StoreError> {
        let connection = self.database_client.connection().await?;
        retry_busy(|| {
            connection.execute(
                "INSERT INTO users (login, display_name, avatar_url, role, created_at, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(login) DO UPDATE SET
                     display_name = excluded.display_name,
                     avatar_url = excluded.avatar_url,
                     last_seen_at = excluded.last_seen_at",
                params![
                    login,
                    nullable_text(display_name.clone()),
                    nullable_text(avatar_url.clone()),
                    role.as_str(),
                    format_ledger_timestamp(Utc::now())
                ],
            )
        })
        .await?;

        self.get_by_login(login).await
    }

    pub async fn get_by_login(&self, login: &str) -> Result<User, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM users WHERE login = ?1", USER_COLUMNS),
                params![login],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_user_row(&data_row),
            None => Err(StoreError::NotFound("USER")),
        }
    }

    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM users ORDER BY login ASC", USER_COLUMNS),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut user_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            user_collection.push(map_user_row(&data_row)?);
        }
        Ok(user_collection)
    }
}

/// Repositorio de clientes de API (automatización externa).
pub struct ClientRepository {
    database_client: DbClient,
}

impl ClientRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Client, StoreError> {
        if name.is_empty() {
            return Err(StoreError::Validation(
                helmsman_domain_models::ValidationFault {
                    field: "client.name",
                    rule: "name must be non-empty".into(),
                },
            ));
        }

        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO clients (name, description, created_at)
                 VALUES (?1, ?2, ?3)
                 RETURNING id",
                params![
                    name,
                    nullable_text(description),
                    format_ledger_timestamp(Utc::now())
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("CLIENT"))?;
        let client_id = column_i64(&identity_row, 0)?;

        self.get(client_id).await
    }

    pub async fn get(&self, client_id: i64) -> Result<Client, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT id, name, description, created_at, last_seen_at
                 FROM clients WHERE id = ?1",
                params![client_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_client_row(&data_row),
            None => Err(StoreError::NotFound("CLIENT")),
        }
    }

    pub async fn list(&self) -> Result<Vec<Client>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                "SELECT id, name, description, created_at, last_seen_at
                 FROM clients ORDER BY name ASC",
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut client_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            client_collection.push(map_client_row(&data_row)?);
        }
        Ok(client_collection)
    }

    /// Sella last_seen_at del cliente nominal.
    pub async fn touch(&self, client_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE clients SET last_seen_at = ?2 WHERE id = ?1",
                params![client_id, format_ledger_timestamp(Utc::now())],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("CLIENT"));
        }
        Ok(())
    }

    pub async fn delete(&self, client_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute("DELETE FROM clients WHERE id = ?1", params![client_id])
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("CLIENT"));
        }
        Ok(())
    }
}

fn map_client_row(data_row: &Row) -> Result<Client, StoreError> {
    Ok(Client {
        id: column_i64(data_row, 0)?,
        name: column_text(data_row, 1)?,
        description: column_opt_text(data_row, 2)?,
        created_at: column_timestamp(data_row, 3)?,
        last_seen_at: column_opt_timestamp(data_row, 4)?,
    })
}

fn map_user_row(data_row: &Row) -> Result<User, StoreError> {
    let role_label = column_text(data_row, 4)?;
    Ok(User {
        id: column_i64(data_row, 0)?,
        login: column_text(data_row, 1)?,
        display_name: column_opt_text(data_row, 2)?,
        avatar_url: column_opt_text(data_row, 3)?,
        role: Role::parse(&role_label)
            .ok_or_else(|| StoreError::Mapping(format!("ROLE_VIOLATION: {}", role_label)))?,
        created_at: column_timestamp(data_row, 5)?,
        last_seen_at: column_opt_timestamp(data_row, 6)?,
    })
}
