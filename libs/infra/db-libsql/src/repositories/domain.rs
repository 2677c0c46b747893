// [libs/infra/db-libsql/src/repositories/domain.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN REPOSITORY (V4.3 - GUARDED TRANSITIONS)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE DOMINIOS Y TENTATIVAS DE VERIFICACIÓN
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. CLOSED GATE: update_status acepta únicamente los cinco valores del
 *    catálogo; cualquier literal externo colapsa en ValidationFault sin
 *    tocar el Ledger. Re-aplicar el mismo valor es idempotente.
 * 2. TOKEN GENESIS: El token de 32 hex nace con la fila del dominio.
 * 3. ATTEMPT LEDGER: Las tentativas (A/CNAME/TXT) y el estado del
 *    dominio se sellan en una sola transacción al completar.
 * =================================================================
 */

use crate::client::{begin_write, retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_i64, column_opt_i64, column_opt_text, column_opt_timestamp, column_text,
    column_timestamp, format_ledger_timestamp, nullable_i64, nullable_text,
};
use chrono::{DateTime, Utc};
use helmsman_domain_models::{
    Domain, DomainStatus, DomainVerification, ValidationFault, VerificationMethod,
    VerificationStatus,
};
use libsql::{params, Row};
use tracing::{info, instrument};

const DOMAIN_COLUMNS: &str = "id, name, status, provider, zone_id, verification_token, \
     verification_checked_at, certificate_id, created_at, updated_at";

const VERIFICATION_COLUMNS: &str = "id, domain_id, method, challenge, status, checked_at, created_at";

/// Repositorio de autoridad única para dominios y su máquina de verificación.
pub struct DomainRepository {
    database_client: DbClient,
}

impl DomainRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /**
     * Registra un dominio en estado 'pending' con su token de 32 hex.
     *
     * # Errors:
     * - `StoreError::Conflict`: nombre de dominio duplicado.
     */
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        name: &str,
        provider: Option<String>,
        zone_id: Option<String>,
    ) -> Result<Domain, StoreError> {
        helmsman_domain_models::validation::validate_domain_name(name)?;

        let verification_token = Domain::generate_verification_token();
        let sealed_at = format_ledger_timestamp(Utc::now());

        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO domains (name, status, provider, zone_id, verification_token, \
                     created_at, updated_at)
                 VALUES (?1, 'pending', ?2, ?3, ?4, ?5, ?5)
                 RETURNING id",
                params![
                    name,
                    nullable_text(provider),
                    nullable_text(zone_id),
                    verification_token,
                    sealed_at
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("DOMAIN"))?;
        let domain_id = column_i64(&identity_row, 0)?;

        info!("🌍 [DOMAIN_SEALED]: '{}' registered with verification token.", name);
        self.get(domain_id).await
    }

    pub async fn get(&self, domain_id: i64) -> Result<Domain, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM domains WHERE id = ?1", DOMAIN_COLUMNS),
                params![domain_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_domain_row(&data_row),
            None => Err(StoreError::NotFound("DOMAIN")),
        }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Domain, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM domains WHERE name = ?1", DOMAIN_COLUMNS),
                params![name],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_domain_row(&data_row),
            None => Err(StoreError::NotFound("DOMAIN")),
        }
    }

    pub async fn list(&self) -> Result<Vec<Domain>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!("SELECT {} FROM domains ORDER BY name ASC", DOMAIN_COLUMNS),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut domain_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            domain_collection.push(map_domain_row(&data_row)?);
        }
        Ok(domain_collection)
    }

    /**
     * Transición de estado con compuerta cerrada.
     *
     * # Errors:
     * - `StoreError::Validation`: literal fuera del catálogo de cinco valores.
     * - `StoreError::NotFound`: dominio inexistente.
     */
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        domain_id: i64,
        status_label: &str,
    ) -> Result<Domain, StoreError> {
        let next_status = DomainStatus::parse(status_label).ok_or_else(|| {
            StoreError::Validation(ValidationFault {
                field: "domain.status",
                rule: format!("'{}' is outside the legal catalog", status_label),
            })
        })?;

        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE domains SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![
                    domain_id,
                    next_status.as_str(),
                    format_ledger_timestamp(Utc::now())
                ],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("DOMAIN"));
        }
        self.get(domain_id).await
    }

    /// Asocia el certificado activo del dominio.
    pub async fn attach_certificate(
        &self,
        domain_id: i64,
        certificate_id: Option<i64>,
    ) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE domains SET certificate_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![
                    domain_id,
                    nullable_i64(certificate_id),
                    format_ledger_timestamp(Utc::now())
                ],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("DOMAIN"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, domain_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute("DELETE FROM domains WHERE id = ?1", params![domain_id])
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("DOMAIN"));
        }
        Ok(())
    }

    // --- ESTRATO DE TENTATIVAS DE VERIFICACIÓN ---

    /**
     * Abre una tentativa de verificación y transiciona el dominio a
     * 'verifying' en la misma transacción.
     */
    #[instrument(skip(self, challenge))]
    pub async fn create_verification(
        &self,
        domain_id: i64,
        method: VerificationMethod,
        challenge: &str,
    ) -> Result<DomainVerification, StoreError> {
        // Existencia previa del dominio (la tentativa no crea dominios).
        self.get(domain_id).await?;

        let sealed_at = format_ledger_timestamp(Utc::now());
        let connection = self.database_client.connection().await?;
        let attempt_transaction = begin_write(&connection).await?;

        let mut insert_rows = attempt_transaction
            .query(
                "INSERT INTO domain_verifications (domain_id, method, challenge, status, created_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4)
                 RETURNING id",
                params![domain_id, method.as_str(), challenge, sealed_at.clone()],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("DOMAIN_VERIFICATION"))?;
        let verification_id = column_i64(&identity_row, 0)?;
        drop(insert_rows);

        attempt_transaction
            .execute(
                "UPDATE domains SET status = 'verifying', updated_at = ?2 WHERE id = ?1",
                params![domain_id, sealed_at],
            )
            .await
            .map_err(StoreError::classify)?;

        attempt_transaction
            .commit()
            .await
            .map_err(StoreError::classify)?;

        self.get_verification(verification_id).await
    }

    pub async fn get_verification(
        &self,
        verification_id: i64,
    ) -> Result<DomainVerification, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM domain_verifications WHERE id = ?1",
                    VERIFICATION_COLUMNS
                ),
                params![verification_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_verification_row(&data_row),
            None => Err(StoreError::NotFound("DOMAIN_VERIFICATION")),
        }
    }

    pub async fn list_verifications(
        &self,
        domain_id: i64,
    ) -> Result<Vec<DomainVerification>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM domain_verifications WHERE domain_id = ?1
                     ORDER BY created_at DESC, id DESC",
                    VERIFICATION_COLUMNS
                ),
                params![domain_id],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut attempt_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            attempt_collection.push(map_verification_row(&data_row)?);
        }
        Ok(attempt_collection)
    }

    /**
     * Sella el veredicto de una tentativa y transiciona el dominio
     * (verified | error) en una única transacción.
     */
    #[instrument(skip(self))]
    pub async fn complete_verification(
        &self,
        verification_id: i64,
        verified: bool,
        checked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let attempt = self.get_verification(verification_id).await?;
        let checked_label = format_ledger_timestamp(checked_at);

        let attempt_verdict = if verified {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Failed
        };
        let domain_verdict = if verified {
            DomainStatus::Verified
        } else {
            DomainStatus::Error
        };

        let connection = self.database_client.connection().await?;
        let verdict_transaction = begin_write(&connection).await?;

        verdict_transaction
            .execute(
                "UPDATE domain_verifications SET status = ?2, checked_at = ?3 WHERE id = ?1",
                params![verification_id, attempt_verdict.as_str(), checked_label.clone()],
            )
            .await
            .map_err(StoreError::classify)?;

        verdict_transaction
            .execute(
                "UPDATE domains SET status = ?2, verification_checked_at = ?3, updated_at = ?3
                 WHERE id = ?1",
                params![attempt.domain_id, domain_verdict.as_str(), checked_label],
            )
            .await
            .map_err(StoreError::classify)?;

        verdict_transaction
            .commit()
            .await
            .map_err(StoreError::classify)?;

        info!(
            "🌍 [VERIFICATION_SEALED]: Attempt {} on domain {} -> {}.",
            verification_id,
            attempt.domain_id,
            attempt_verdict.as_str()
        );
        Ok(())
    }
}

fn map_domain_row(data_row: &Row) -> Result<Domain, StoreError> {
    let status_label = column_text(data_row, 2)?;
    Ok(Domain {
        id: column_i64(data_row, 0)?,
        name: column_text(data_row, 1)?,
        status: DomainStatus::parse(&status_label).ok_or_else(|| {
            StoreError::Mapping(format!("DOMAIN_STATUS_VIOLATION: {}", status_label))
        })?,
        provider: column_opt_text(data_row, 3)?,
        zone_id: column_opt_text(data_row, 4)?,
        verification_token: column_text(data_row, 5)?,
        verification_checked_at: column_opt_timestamp(data_row, 6)?,
        certificate_id: column_opt_i64(data_row, 7)?,
        created_at: column_timestamp(data_row, 8)?,
        updated_at: column_timestamp(data_row, 9)?,
    })
}

fn map_verification_row(data_row: &Row) -> Result<DomainVerification, StoreError> {
    let method_label = column_text(data_row, 2)?;
    let status_label = column_text(data_row, 4)?;
    Ok(DomainVerification {
        id: column_i64(data_row, 0)?,
        domain_id: column_i64(data_row, 1)?,
        method: VerificationMethod::parse(&method_label).ok_or_else(|| {
            StoreError::Mapping(format!("VERIFICATION_METHOD_VIOLATION: {}", method_label))
        })?,
        challenge: column_text(data_row, 3)?,
        status: VerificationStatus::parse(&status_label).ok_or_else(|| {
            StoreError::Mapping(format!("VERIFICATION_STATUS_VIOLATION: {}", status_label))
        })?,
        checked_at: column_opt_timestamp(data_row, 5)?,
        created_at: column_timestamp(data_row, 6)?,
    })
}
