// [tests/mirror/libs/infra/db_libsql/snapshot_single_active.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE SNAPSHOT ÚNICO ACTIVO (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL INVARIANTE |{s : s.active}| ≤ 1
 * =================================================================
 */

use helmsman_infra_db::repositories::SnapshotRepository;
use helmsman_infra_db::{DbClient, StoreError};

async fn proving_ground(tag: &str) -> (SnapshotRepository, DbClient) {
    let database_client = DbClient::connect(&format!("file:{}?mode=memory&cache=shared", tag))
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    (SnapshotRepository::new(database_client.clone()), database_client)
}

async fn active_count(database_client: &DbClient) -> i64 {
    let connection = database_client.connection().await.expect("pool allocation");
    let mut count_rows = connection
        .query(
            "SELECT COUNT(*) FROM proxy_config_snapshots WHERE active = 1",
            (),
        )
        .await
        .expect("count sweep");
    count_rows
        .next()
        .await
        .expect("cursor")
        .expect("count row")
        .get::<i64>(0)
        .expect("count column")
}

#[tokio::test]
async fn certify_activation_flips_exactly_one() {
    let (snapshots, database_client) = proving_ground("mem_snapshot_single").await;

    let first = snapshots.insert("hash-a", "config-a").await.expect("first seal");
    let second = snapshots.insert("hash-b", "config-b").await.expect("second seal");

    // Los snapshots nacen inactivos.
    assert_eq!(active_count(&database_client).await, 0);

    snapshots.activate(first.id).await.expect("first activation");
    assert_eq!(active_count(&database_client).await, 1);

    // La activación del segundo desactiva al primero en la MISMA transacción.
    snapshots.activate(second.id).await.expect("second activation");
    assert_eq!(active_count(&database_client).await, 1);

    let live = snapshots.active().await.expect("active lookup").expect("live snapshot");
    assert_eq!(live.id, second.id);
    assert_eq!(live.config_hash, "hash-b");
}

#[tokio::test]
async fn certify_missing_id_keeps_previous_active() {
    let (snapshots, database_client) = proving_ground("mem_snapshot_missing").await;

    let sealed = snapshots.insert("hash-a", "config-a").await.expect("seal");
    snapshots.activate(sealed.id).await.expect("activation");

    // Identificador inexistente: NotFound y el activo previo sobrevive.
    assert!(matches!(
        snapshots.activate(999_999).await,
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(active_count(&database_client).await, 1);
    assert_eq!(
        snapshots.active().await.expect("lookup").expect("live").id,
        sealed.id
    );
}

#[tokio::test]
async fn certify_prune_spares_active_history() {
    let (snapshots, database_client) = proving_ground("mem_snapshot_prune").await;

    for index in 0..6 {
        snapshots
            .insert(&format!("hash-{}", index), "config")
            .await
            .expect("seal");
    }
    let live = snapshots.insert("hash-live", "config").await.expect("seal");
    snapshots.activate(live.id).await.expect("activation");

    let purged = snapshots.prune_inactive(2).await.expect("prune sweep");
    assert_eq!(purged, 4);

    // El activo jamás se poda.
    assert_eq!(active_count(&database_client).await, 1);
    assert_eq!(snapshots.list(50).await.expect("listing").len(), 3);
}
