// [tests/mirror/libs/infra/db_libsql/token_governance.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE GOBERNANZA DE TOKENS (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE EMISIÓN, VERIFICACIÓN Y RBAC
 * =================================================================
 */

use helmsman_domain_models::Role;
use helmsman_infra_db::repositories::TokenRepository;
use helmsman_infra_db::{DbClient, StoreError};

async fn proving_ground(tag: &str) -> TokenRepository {
    let database_client = DbClient::connect(&format!("file:{}?mode=memory&cache=shared", tag))
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    TokenRepository::new(database_client)
}

#[tokio::test]
async fn certify_emission_is_admin_gated() {
    let tokens = proving_ground("mem_token_gate").await;

    // Deployer y viewer: emisión denegada.
    assert!(matches!(
        tokens.create(Role::Deployer, "ci", "secret", "viewer").await,
        Err(StoreError::PreconditionFailed(_))
    ));
    assert!(matches!(
        tokens.create(Role::Viewer, "ci", "secret", "viewer").await,
        Err(StoreError::PreconditionFailed(_))
    ));

    // Admin emite cualquier rol del catálogo.
    let sealed = tokens
        .create(Role::Admin, "ci-deployer", "s3cr3t-material", "deployer")
        .await
        .expect("emission sealed");
    assert_eq!(sealed.role, Role::Deployer);
    assert!(sealed.secret_hash.starts_with("$pbkdf2"));

    // Rol fuera del catálogo: rechazo de frontera.
    assert!(matches!(
        tokens.create(Role::Admin, "other", "secret", "root").await,
        Err(StoreError::Validation(_))
    ));

    // Nombre duplicado: conflicto.
    assert!(matches!(
        tokens
            .create(Role::Admin, "ci-deployer", "other-secret", "viewer")
            .await,
        Err(StoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn certify_verify_sweep_and_touch() {
    let tokens = proving_ground("mem_token_verify").await;

    tokens
        .create(Role::Admin, "alpha", "alpha-secret", "viewer")
        .await
        .expect("alpha sealed");
    tokens
        .create(Role::Admin, "beta", "beta-secret", "deployer")
        .await
        .expect("beta sealed");

    // La verificación barre los hashes y retorna el nombre coincidente.
    assert_eq!(
        tokens.verify("beta-secret").await.expect("sweep verdict"),
        "beta"
    );

    // Secreto ajeno: token inválido.
    assert!(matches!(
        tokens.verify("unknown-material").await,
        Err(StoreError::NotFound(_))
    ));

    // touch() sella last_used_at.
    tokens.touch("beta").await.expect("touch seal");
    let touched = tokens
        .list()
        .await
        .expect("listing")
        .into_iter()
        .find(|token| token.name == "beta")
        .expect("beta present");
    assert!(touched.last_used_at.is_some());
}

#[tokio::test]
async fn certify_hash_never_serializes() {
    let tokens = proving_ground("mem_token_shape").await;

    let sealed = tokens
        .create(Role::Admin, "shape", "shape-secret", "viewer")
        .await
        .expect("emission sealed");

    let rendered = serde_json::to_string(&sealed).expect("public view");
    assert!(!rendered.contains("secret_hash"));
    assert!(!rendered.contains("pbkdf2"));
}
