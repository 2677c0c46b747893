// [tests/mirror/libs/infra/search/query_shape.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE FORMA DE RESULTADOS (V2.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL CONTRATO DE query() Y suggest()
 * =================================================================
 */

use helmsman_domain_models::SearchEntityType;
use helmsman_infra_db::DbClient;
use helmsman_infra_search::{SearchFilter, SearchIndex};

async fn seeded_ground(tag: &str) -> SearchIndex {
    let database_client = DbClient::connect(&format!("file:{}?mode=memory&cache=shared", tag))
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");

    let index = SearchIndex::open(database_client)
        .await
        .expect("index ignition");
    index.reindex().await.expect("catalog seeding");
    index
}

#[tokio::test]
async fn certify_static_page_query_shape() {
    let index = seeded_ground("mem_query_pages").await;

    let filter = SearchFilter {
        entity_type: Some(SearchEntityType::Page),
        allow_basic: true,
        limit: Some(10),
        ..SearchFilter::default()
    };
    let (hits, total) = index.query("settings", &filter).await.expect("query verdict");

    // Forma del contrato: al menos un hit, todos de tipo page bajo /app/.
    assert!(total >= 1);
    assert!(!hits.is_empty());
    assert!(hits
        .iter()
        .all(|hit| hit.doc.entity_type == SearchEntityType::Page));
    assert!(hits.iter().all(|hit| hit.doc.url_path.starts_with("/app/")));
    assert!(hits.iter().any(|hit| hit.doc.title == "Settings"));
}

#[tokio::test]
async fn certify_type_filter_is_exclusive() {
    let index = seeded_ground("mem_query_filter").await;

    let filter = SearchFilter {
        entity_type: Some(SearchEntityType::Help),
        allow_basic: true,
        limit: Some(10),
        ..SearchFilter::default()
    };
    let (hits, _) = index.query("crash", &filter).await.expect("query verdict");

    assert!(!hits.is_empty());
    assert!(hits
        .iter()
        .all(|hit| hit.doc.entity_type == SearchEntityType::Help));
}

#[tokio::test]
async fn certify_empty_query_lists_by_freshness() {
    let index = seeded_ground("mem_query_empty").await;

    let filter = SearchFilter {
        allow_basic: true,
        limit: Some(10),
        ..SearchFilter::default()
    };
    let (hits, total) = index.query("", &filter).await.expect("match-all verdict");

    assert!(total > 10);
    assert_eq!(hits.len(), 10);
}

#[tokio::test]
async fn certify_suggest_prefix_discipline() {
    let index = seeded_ground("mem_query_suggest").await;

    // Prefijo bajo el umbral: vacío sin tocar el motor.
    assert!(index.suggest("s", 8).await.expect("short prefix").is_empty());

    let suggestions = index.suggest("se", 8).await.expect("suggest verdict");
    assert!(suggestions
        .iter()
        .any(|suggestion| suggestion.contains("Se") || suggestion.contains("se")));
}
