// [tests/mirror/libs/infra/db_libsql/env_var_exclusivity.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL INVARIANTE XOR (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE VARIABLES SECRETAS Y LOTES ATÓMICOS
 * =================================================================
 */

use helmsman_core_vault as vault;
use helmsman_infra_db::repositories::{
    EnvVarInput, EnvVarRepository, ProjectRepository, ServiceRepository, ServiceSpec,
};
use helmsman_infra_db::{DbClient, EventBridge, StoreError};

/// Llave maestra fija del Proving Grounds (idéntica entre tests del binario).
const PROVING_KEY: [u8; 32] = [7u8; 32];

async fn proving_ground(tag: &str) -> (EnvVarRepository, i64) {
    vault::install_master_key(PROVING_KEY);

    let database_client = DbClient::connect(&format!("file:{}?mode=memory&cache=shared", tag))
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    let bridge = EventBridge::disconnected();

    let projects = ProjectRepository::new(database_client.clone(), bridge.clone());
    let services = ServiceRepository::new(database_client.clone(), bridge);

    let project = projects
        .create("edge", None, None, None)
        .await
        .expect("project genesis");
    let service = services
        .create(project.id, "api", "ghcr.io/acme/api:v1", ServiceSpec::default())
        .await
        .expect("service genesis");

    (EnvVarRepository::new(database_client), service.id)
}

#[tokio::test]
async fn certify_xor_scenario_end_to_end() {
    let (env_vars, service_id) = proving_ground("mem_env_xor").await;

    // 1. Forma plana: legal.
    env_vars
        .set(service_id, EnvVarInput::plain("K", "v"))
        .await
        .expect("plain form accepted");

    // 2. Secreto sin material: rechazado sin tocar el Ledger.
    assert!(matches!(
        env_vars
            .set(service_id, EnvVarInput::secret("K", Vec::new(), Vec::new()))
            .await,
        Err(StoreError::Validation(_))
    ));

    // 3. Secreto con nonce de 12 bytes y ciphertext: legal (reemplaza).
    let master_key = vault::master_key().expect("proving key");
    let (nonce, ciphertext) = vault::encrypt(&master_key, b"classified");
    env_vars
        .set(service_id, EnvVarInput::secret("K", nonce, ciphertext))
        .await
        .expect("secret form accepted");

    // 4. Exactamente una entrada con llave K, marcada secreta.
    let listing = env_vars.list(service_id).await.expect("listing sweep");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].key, "K");
    assert!(listing[0].is_secret);
    assert!(listing[0].value.is_empty());
    assert!(!listing[0].ciphertext.is_empty());

    // 5. La resolución descifra en memoria.
    let resolved = env_vars.resolved_env(service_id).await.expect("resolution");
    assert_eq!(resolved.get("K").map(String::as_str), Some("classified"));
}

#[tokio::test]
async fn certify_bulk_set_is_atomic() {
    let (env_vars, service_id) = proving_ground("mem_env_bulk").await;

    env_vars
        .set(service_id, EnvVarInput::plain("KEEP", "original"))
        .await
        .expect("baseline seal");

    // Lote con un elemento venenoso: el lote completo debe revertir.
    let poisoned_batch = vec![
        EnvVarInput::plain("KEEP", "mutated"),
        EnvVarInput::secret("POISON", Vec::new(), Vec::new()),
    ];
    assert!(env_vars.bulk_set(service_id, poisoned_batch).await.is_err());

    let listing = env_vars.list(service_id).await.expect("listing sweep");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].value, "original");

    // Lote sano: ambos elementos comprometen juntos.
    env_vars
        .bulk_set(
            service_id,
            vec![
                EnvVarInput::plain("KEEP", "mutated"),
                EnvVarInput::plain("PORT", "8080"),
            ],
        )
        .await
        .expect("healthy batch");

    let listing = env_vars.list(service_id).await.expect("listing sweep");
    assert_eq!(listing.len(), 2);

    // BulkDelete en una transacción.
    env_vars
        .bulk_delete(service_id, vec!["KEEP".into(), "PORT".into()])
        .await
        .expect("batch purge");
    assert!(env_vars.list(service_id).await.expect("listing sweep").is_empty());
}

#[tokio::test]
async fn certify_seal_secret_helper_roundtrips() {
    let (env_vars, service_id) = proving_ground("mem_env_seal").await;

    let sealed_input = EnvVarInput::seal_secret("TOKEN", "s3cr3t").expect("sealing");
    env_vars
        .set(service_id, sealed_input)
        .await
        .expect("sealed secret accepted");

    let resolved = env_vars.resolved_env(service_id).await.expect("resolution");
    assert_eq!(resolved.get("TOKEN").map(String::as_str), Some("s3cr3t"));
}
