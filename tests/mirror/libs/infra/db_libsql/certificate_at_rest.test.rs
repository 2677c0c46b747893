// [tests/mirror/libs/infra/db_libsql/certificate_at_rest.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CIFRADO EN REPOSO (V2.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL ESCUDO AT-REST DE CERTIFICADOS
 * =================================================================
 */

use helmsman_core_vault as vault;
use helmsman_infra_db::repositories::CertificateRepository;
use helmsman_infra_db::{DbClient, EventBridge};

const PROVING_KEY: [u8; 32] = [7u8; 32];

async fn proving_ground(tag: &str) -> (CertificateRepository, DbClient) {
    vault::install_master_key(PROVING_KEY);

    let database_client = DbClient::connect(&format!("file:{}?mode=memory&cache=shared", tag))
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    (
        CertificateRepository::new(database_client.clone(), EventBridge::disconnected()),
        database_client,
    )
}

#[tokio::test]
async fn certify_upload_roundtrip_and_redaction() {
    let (certificates, database_client) = proving_ground("mem_cert_roundtrip").await;

    let cert_pem = "-----BEGIN CERT-----X";
    let key_pem = "-----BEGIN KEY-----Y";

    let sealed = certificates
        .create_uploaded("example.com", cert_pem, key_pem, None)
        .await
        .expect("upload sealed");

    // 1. El plaintext de la llave jamás persiste.
    let connection = database_client.connection().await.expect("pool allocation");
    let mut raw_rows = connection
        .query(
            "SELECT key_ciphertext FROM certificates WHERE id = ?1",
            libsql::params![sealed.id],
        )
        .await
        .expect("raw sweep");
    let raw_row = raw_rows.next().await.expect("cursor").expect("row");
    let persisted_ciphertext: Vec<u8> = raw_row.get(0).expect("ciphertext column");
    assert!(!persisted_ciphertext.is_empty());
    assert_ne!(persisted_ciphertext.as_slice(), key_pem.as_bytes());

    // 2. La lectura individual restituye la llave en memoria.
    let reread = certificates.get(sealed.id).await.expect("decrypting read");
    assert_eq!(reread.key_data.as_deref(), Some(key_pem));
    assert_eq!(reread.cert_data.as_deref(), Some(cert_pem));

    // 3. La vista pública redacta longitud + huella.
    let redacted = certificates
        .redacted_key_view(sealed.id)
        .await
        .expect("redacted view");
    assert_eq!(redacted, vault::redact(key_pem.as_bytes()));
    assert!(redacted.starts_with(&format!("[REDACTED: length={}, fingerprint=", key_pem.len())));
    assert!(!redacted.contains("KEY"));

    // 4. Los listados públicos omiten el material.
    let listing = certificates.list().await.expect("public listing");
    assert!(listing.iter().all(|certificate| certificate.key_data.is_none()));
}

#[tokio::test]
async fn certify_get_by_domain_prefers_latest_active() {
    let (certificates, _) = proving_ground("mem_cert_latest").await;

    let elder = certificates
        .create_uploaded("example.com", "CERT_A", "KEY_A", None)
        .await
        .expect("elder sealed");
    let newer = certificates
        .create_uploaded("example.com", "CERT_B", "KEY_B", None)
        .await
        .expect("newer sealed");

    let active = certificates
        .get_by_domain("example.com")
        .await
        .expect("active lookup");
    assert_eq!(active.id, newer.id);
    assert_eq!(active.key_data.as_deref(), Some("KEY_B"));

    // Degradar la fila nueva restituye la anterior como activa.
    certificates.mark_expired(newer.id).await.expect("degradation");
    let fallback = certificates
        .get_by_domain("example.com")
        .await
        .expect("fallback lookup");
    assert_eq!(fallback.id, elder.id);
}
