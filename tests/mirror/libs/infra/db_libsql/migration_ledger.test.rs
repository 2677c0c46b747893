// [tests/mirror/libs/infra/db_libsql/migration_ledger.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL LEDGER DE MIGRACIONES (V2.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA CADENA MONÓTONA DE VERSIONES
 * =================================================================
 */

use helmsman_infra_db::migrations::{apply_pending_migrations, max_applied_version};
use helmsman_infra_db::DbClient;

#[tokio::test]
async fn certify_fresh_install_reaches_head() {
    let database_client = DbClient::connect("file:mem_migration_head?mode=memory&cache=shared")
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    let connection = database_client.connection().await.expect("pool allocation");

    // La apertura aplicó el catálogo completo.
    let head_version = max_applied_version(&connection).await.expect("ledger read");
    assert_eq!(head_version, 5);

    // Idempotencia: una segunda pasada no aplica estrato alguno.
    let reapplied = apply_pending_migrations(&connection)
        .await
        .expect("reapplication sweep");
    assert_eq!(reapplied, 0);
}

#[tokio::test]
async fn certify_version_chain_is_strictly_monotonic() {
    let database_client = DbClient::connect("file:mem_migration_chain?mode=memory&cache=shared")
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    let connection = database_client.connection().await.expect("pool allocation");

    let mut version_rows = connection
        .query("SELECT version FROM schema_version ORDER BY version ASC", ())
        .await
        .expect("version sweep");

    let mut observed_versions = Vec::new();
    while let Some(data_row) = version_rows.next().await.expect("row cursor") {
        observed_versions.push(data_row.get::<i64>(0).expect("version column"));
    }

    assert_eq!(observed_versions, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn certify_schema_tables_materialized() {
    let database_client = DbClient::connect("file:mem_migration_tables?mode=memory&cache=shared")
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    let connection = database_client.connection().await.expect("pool allocation");

    for expected_table in [
        "projects",
        "services",
        "env_vars",
        "service_links",
        "routes",
        "certificates",
        "domains",
        "domain_verifications",
        "proxy_config_snapshots",
        "search_docs",
        "tokens",
        "users",
        "clients",
        "settings",
        "oauth_states",
        "audit_entries",
        "metric_samples",
        "registries",
        "env_templates",
        "github_installations",
        "webhook_deliveries",
    ] {
        let mut presence_rows = connection
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                libsql::params![expected_table],
            )
            .await
            .expect("presence probe");
        let data_row = presence_rows
            .next()
            .await
            .expect("row cursor")
            .expect("count row");
        assert_eq!(
            data_row.get::<i64>(0).expect("count column"),
            1,
            "table '{}' must be materialized",
            expected_table
        );
    }
}
