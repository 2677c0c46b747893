// [libs/infra/db-libsql/src/repositories/certificate.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICATE REPOSITORY (V6.0 - AT-REST SHIELD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA X.509 CON LLAVE CIFRADA EN REPOSO
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. ENCRYPT BEFORE WRITE: El material de llave se cifra bajo la llave
 *    maestra ANTES de tocar el Ledger; el plaintext jamás persiste.
 * 2. DECRYPT ON DEMAND: Las lecturas individuales restituyen la llave en
 *    memoria; los listados públicos omiten el material.
 * 3. EXPIRY LEDGER: not_after < now degrada el estado reportado y
 *    alimenta el barrido de renovación ACME.
 * =================================================================
 */

use crate::client::{retry_busy, DbClient};
use crate::errors::StoreError;
use crate::mapping::{
    column_blob, column_bool, column_i64, column_opt_text, column_opt_timestamp, column_text,
    column_timestamp, format_ledger_timestamp, nullable_text, nullable_timestamp,
};
use crate::signals::EventBridge;
use chrono::{DateTime, Utc};
use helmsman_core_vault as vault;
use helmsman_domain_models::{Certificate, CertificateStatus, CertificateType};
use libsql::{params, Row};
use tracing::{info, instrument};

const CERTIFICATE_COLUMNS: &str = "id, domain, cert_type, cert_data, key_nonce, \
     key_ciphertext, expires_at, auto_renew, issuer, not_before, not_after, status, \
     pem_chain, created_at, updated_at";

/// Material enriquecido entregado por el colaborador ACME.
#[derive(Debug, Clone)]
pub struct IssuedMaterial {
    pub cert_pem: String,
    pub chain_pem: Option<String>,
    pub key_pem: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Repositorio de autoridad única para material X.509.
pub struct CertificateRepository {
    database_client: DbClient,
    event_bridge: EventBridge,
}

impl CertificateRepository {
    pub fn new(client: DbClient, bridge: EventBridge) -> Self {
        Self {
            database_client: client,
            event_bridge: bridge,
        }
    }

    /**
     * Registra un certificado subido por el operador (PEM cert/key).
     * La llave privada se cifra antes de la escritura.
     */
    #[instrument(skip(self, cert_pem, key_pem))]
    pub async fn create_uploaded(
        &self,
        domain: &str,
        cert_pem: &str,
        key_pem: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Certificate, StoreError> {
        let master_key = vault::master_key()?;
        let (key_nonce, key_ciphertext) = vault::encrypt(&master_key, key_pem.as_bytes());

        let sealed_at = format_ledger_timestamp(Utc::now());
        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO certificates (domain, cert_type, cert_data, key_nonce, \
                     key_ciphertext, expires_at, auto_renew, status, created_at, updated_at)
                 VALUES (?1, 'uploaded', ?2, ?3, ?4, ?5, 0, 'active', ?6, ?6)
                 RETURNING id",
                params![
                    domain,
                    cert_pem,
                    key_nonce,
                    key_ciphertext,
                    nullable_timestamp(expires_at),
                    sealed_at
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("CERTIFICATE"))?;
        let certificate_id = column_i64(&identity_row, 0)?;

        info!("🔐 [CERT_SEALED]: Uploaded material for '{}' encrypted at rest.", domain);
        self.event_bridge.mark_proxy_dirty();

        self.get(certificate_id).await
    }

    /**
     * Persiste material emitido por el colaborador ACME como forma
     * enriquecida (issuer, ventana de validez, cadena) con estado activo.
     */
    #[instrument(skip(self, issued_material))]
    pub async fn create_acme(
        &self,
        domain: &str,
        issued_material: IssuedMaterial,
    ) -> Result<Certificate, StoreError> {
        let master_key = vault::master_key()?;
        let (key_nonce, key_ciphertext) =
            vault::encrypt(&master_key, issued_material.key_pem.as_bytes());

        let sealed_at = format_ledger_timestamp(Utc::now());
        let connection = self.database_client.connection().await?;
        let mut insert_rows = connection
            .query(
                "INSERT INTO certificates (domain, cert_type, cert_data, key_nonce, \
                     key_ciphertext, expires_at, auto_renew, issuer, not_before, not_after, \
                     status, pem_chain, created_at, updated_at)
                 VALUES (?1, 'acme', ?2, ?3, ?4, ?5, 1, ?6, ?7, ?5, 'active', ?8, ?9, ?9)
                 RETURNING id",
                params![
                    domain,
                    issued_material.cert_pem.clone(),
                    key_nonce,
                    key_ciphertext,
                    format_ledger_timestamp(issued_material.not_after),
                    issued_material.issuer.clone(),
                    format_ledger_timestamp(issued_material.not_before),
                    nullable_text(issued_material.chain_pem.clone()),
                    sealed_at
                ],
            )
            .await
            .map_err(StoreError::classify)?;

        let identity_row = insert_rows
            .next()
            .await
            .map_err(StoreError::classify)?
            .ok_or(StoreError::NotFound("CERTIFICATE"))?;
        let certificate_id = column_i64(&identity_row, 0)?;

        info!("🔐 [CERT_ISSUED]: ACME material for '{}' sealed (issuer {}).",
            domain, issued_material.issuer);
        self.event_bridge.mark_proxy_dirty();

        self.get(certificate_id).await
    }

    /// Lectura individual con la llave privada descifrada en memoria.
    pub async fn get(&self, certificate_id: i64) -> Result<Certificate, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM certificates WHERE id = ?1",
                    CERTIFICATE_COLUMNS
                ),
                params![certificate_id],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_certificate_row(&data_row, true),
            None => Err(StoreError::NotFound("CERTIFICATE")),
        }
    }

    /// Lectura tolerante: None cuando la referencia no existe (rutas colgantes).
    pub async fn try_get(&self, certificate_id: i64) -> Result<Option<Certificate>, StoreError> {
        match self.get(certificate_id).await {
            Ok(certificate) => Ok(Some(certificate)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(fault) => Err(fault),
        }
    }

    /**
     * Certificado activo más reciente para un dominio, llave descifrada.
     */
    pub async fn get_by_domain(&self, domain: &str) -> Result<Certificate, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM certificates
                     WHERE domain = ?1 AND status = 'active'
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    CERTIFICATE_COLUMNS
                ),
                params![domain],
            )
            .await
            .map_err(StoreError::classify)?;

        match query_results.next().await.map_err(StoreError::classify)? {
            Some(data_row) => map_certificate_row(&data_row, true),
            None => Err(StoreError::NotFound("CERTIFICATE")),
        }
    }

    /// Listado público: el material de llave permanece cifrado (key_data None).
    pub async fn list(&self) -> Result<Vec<Certificate>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM certificates ORDER BY domain ASC, created_at DESC",
                    CERTIFICATE_COLUMNS
                ),
                (),
            )
            .await
            .map_err(StoreError::classify)?;

        let mut certificate_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            certificate_collection.push(map_certificate_row(&data_row, false)?);
        }
        Ok(certificate_collection)
    }

    /**
     * Vista pública redactada del material de llave:
     * `[REDACTED: length=L, fingerprint=<8 bytes SHA-256>]`.
     */
    pub async fn redacted_key_view(&self, certificate_id: i64) -> Result<String, StoreError> {
        let certificate = self.get(certificate_id).await?;
        let key_material = certificate.key_data.ok_or(StoreError::NotFound("KEY_MATERIAL"))?;
        Ok(vault::redact(key_material.as_bytes()))
    }

    /// Certificados activos con auto-renovación ya vencidos.
    pub async fn list_for_renewal(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Certificate>, StoreError> {
        let connection = self.database_client.connection().await?;
        let mut query_results = connection
            .query(
                &format!(
                    "SELECT {} FROM certificates
                     WHERE status = 'active' AND auto_renew = 1 AND not_after IS NOT NULL
                       AND not_after < ?1
                     ORDER BY not_after ASC",
                    CERTIFICATE_COLUMNS
                ),
                params![format_ledger_timestamp(now)],
            )
            .await
            .map_err(StoreError::classify)?;

        let mut certificate_collection = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(StoreError::classify)? {
            certificate_collection.push(map_certificate_row(&data_row, false)?);
        }
        Ok(certificate_collection)
    }

    /// Degrada en bloque los certificados vencidos SIN auto-renovación.
    #[instrument(skip(self))]
    pub async fn mark_all_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let connection = self.database_client.connection().await?;
        let degraded_rows = connection
            .execute(
                "UPDATE certificates SET status = 'expired', updated_at = ?1
                 WHERE status = 'active' AND auto_renew = 0 AND not_after IS NOT NULL
                   AND not_after < ?1",
                params![format_ledger_timestamp(now)],
            )
            .await
            .map_err(StoreError::classify)?;

        if degraded_rows > 0 {
            self.event_bridge.mark_proxy_dirty();
        }
        Ok(degraded_rows)
    }

    /// Degrada el estado de una fila a 'expired'.
    #[instrument(skip(self))]
    pub async fn mark_expired(&self, certificate_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "UPDATE certificates SET status = 'expired', updated_at = ?2 WHERE id = ?1",
                params![certificate_id, format_ledger_timestamp(Utc::now())],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("CERTIFICATE"));
        }
        self.event_bridge.mark_proxy_dirty();
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, certificate_id: i64) -> Result<(), StoreError> {
        let connection = self.database_client.connection().await?;
        let affected_rows = retry_busy(|| {
            connection.execute(
                "DELETE FROM certificates WHERE id = ?1",
                params![certificate_id],
            )
        })
        .await?;

        if affected_rows == 0 {
            return Err(StoreError::NotFound("CERTIFICATE"));
        }
        self.event_bridge.mark_proxy_dirty();
        Ok(())
    }
}

fn map_certificate_row(data_row: &Row, decrypt_key: bool) -> Result<Certificate, StoreError> {
    let type_label = column_text(data_row, 2)?;
    let status_label = column_text(data_row, 11)?;

    let key_nonce = column_blob(data_row, 4)?;
    let key_ciphertext = column_blob(data_row, 5)?;

    // Descifrado bajo demanda: solo cuando ambos materiales están presentes.
    let key_data = if decrypt_key && !key_nonce.is_empty() && !key_ciphertext.is_empty() {
        let master_key = vault::master_key()?;
        let plaintext_bytes = vault::decrypt(&master_key, &key_nonce, &key_ciphertext)?;
        Some(String::from_utf8(plaintext_bytes).map_err(|_| StoreError::DecryptionFailed)?)
    } else {
        None
    };

    Ok(Certificate {
        id: column_i64(data_row, 0)?,
        domain: column_text(data_row, 1)?,
        cert_type: CertificateType::parse(&type_label).ok_or_else(|| {
            StoreError::Mapping(format!("CERT_TYPE_VIOLATION: {}", type_label))
        })?,
        cert_data: column_opt_text(data_row, 3)?,
        key_data,
        expires_at: column_opt_timestamp(data_row, 6)?,
        auto_renew: column_bool(data_row, 7)?,
        issuer: column_opt_text(data_row, 8)?,
        not_before: column_opt_timestamp(data_row, 9)?,
        not_after: column_opt_timestamp(data_row, 10)?,
        status: CertificateStatus::parse(&status_label).ok_or_else(|| {
            StoreError::Mapping(format!("CERT_STATUS_VIOLATION: {}", status_label))
        })?,
        pem_chain: column_opt_text(data_row, 12)?,
        created_at: column_timestamp(data_row, 13)?,
        updated_at: column_timestamp(data_row, 14)?,
    })
}
