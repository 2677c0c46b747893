// [tests/mirror/libs/infra/db_libsql/audit_telemetry.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE AUDITORÍA Y MÉTRICAS (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL RASTRO APPEND-ONLY Y LA RETENCIÓN
 * =================================================================
 */

use chrono::{Duration, Utc};
use helmsman_domain_models::MetricSample;
use helmsman_infra_db::repositories::{AuditRepository, MetricsRepository};
use helmsman_infra_db::DbClient;

async fn proving_ground(tag: &str) -> (AuditRepository, MetricsRepository) {
    let database_client = DbClient::connect(&format!("file:{}?mode=memory&cache=shared", tag))
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    (
        AuditRepository::new(database_client.clone()),
        MetricsRepository::new(database_client),
    )
}

fn sample(offset_minutes: i64, cpu: f64) -> MetricSample {
    MetricSample {
        id: 0,
        timestamp: Utc::now() - Duration::minutes(offset_minutes),
        cpu_percent: cpu,
        memory_used_bytes: 1024,
        memory_total_bytes: 4096,
        disk_used_bytes: 10,
        disk_total_bytes: 100,
        net_rx_bytes: 1,
        net_tx_bytes: 2,
    }
}

#[tokio::test]
async fn certify_audit_trail_is_newest_first() {
    let (audit, _) = proving_ground("mem_audit_order").await;

    for action in ["project.created", "service.created", "route.created"] {
        audit
            .record("operator", action, "test", "1", serde_json::json!({}))
            .await
            .expect("evidence seal");
    }

    let listing = audit.list(None).await.expect("listing sweep");
    assert_eq!(listing.len(), 3);
    assert_eq!(listing[0].action, "route.created");
    assert_eq!(listing[2].action, "project.created");

    // Límite explícito acotado.
    let limited = audit.list(Some(2)).await.expect("limited sweep");
    assert_eq!(limited.len(), 2);

    // Techo duro de 100 incluso ante peticiones desmesuradas.
    let capped = audit.list(Some(100_000)).await.expect("capped sweep");
    assert!(capped.len() <= 100);
}

#[tokio::test]
async fn certify_metrics_windows_and_retention() {
    let (_, metrics) = proving_ground("mem_metrics_retention").await;

    metrics.insert(&sample(120, 10.0)).await.expect("elder seal");
    metrics.insert(&sample(60, 20.0)).await.expect("middle seal");
    metrics.insert(&sample(1, 30.0)).await.expect("recent seal");

    // since(): cronológico ascendente.
    let window = metrics
        .since(Utc::now() - Duration::minutes(90), 100)
        .await
        .expect("window sweep");
    assert_eq!(window.len(), 2);
    assert!(window[0].timestamp < window[1].timestamp);
    assert_eq!(window[0].cpu_percent, 20.0);

    // latest(): las N más recientes, retornadas oldest-first.
    let latest = metrics.latest(2).await.expect("latest sweep");
    assert_eq!(latest.len(), 2);
    assert!(latest[0].timestamp < latest[1].timestamp);
    assert_eq!(latest[1].cpu_percent, 30.0);

    // cleanup(): incinera por debajo del umbral.
    let purged = metrics
        .cleanup(Utc::now() - Duration::minutes(90))
        .await
        .expect("retention sweep");
    assert_eq!(purged, 1);
    assert_eq!(metrics.latest(10).await.expect("post sweep").len(), 2);
}
