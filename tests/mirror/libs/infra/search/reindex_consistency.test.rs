// [tests/mirror/libs/infra/search/reindex_consistency.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CONSISTENCIA DEL ÍNDICE (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA PUNTO-EN-TIEMPO TRAS reindex()
 *
 * Invariante certificado: para cada entidad canónica existe exactamente
 * un documento con la llave (entity_type, entity_id).
 * =================================================================
 */

use helmsman_core_vault as vault;
use helmsman_infra_db::repositories::{
    ProjectRepository, RegistryRepository, RouteRepository, ServiceRepository, ServiceSpec,
};
use helmsman_infra_db::{DbClient, EventBridge};
use helmsman_infra_search::SearchIndex;

const PROVING_KEY: [u8; 32] = [7u8; 32];

async fn seeded_ground(tag: &str) -> (SearchIndex, DbClient) {
    vault::install_master_key(PROVING_KEY);

    let database_client = DbClient::connect(&format!("file:{}?mode=memory&cache=shared", tag))
        .await
        .expect("CRITICAL_FAULT: ledger ignition failed");
    let bridge = EventBridge::disconnected();

    let projects = ProjectRepository::new(database_client.clone(), bridge.clone());
    let services = ServiceRepository::new(database_client.clone(), bridge.clone());
    let routes = RouteRepository::new(database_client.clone(), bridge.clone());
    let registries = RegistryRepository::new(database_client.clone(), bridge);

    let project = projects
        .create("edge", Some("https://git.example/edge".into()), None, None)
        .await
        .expect("project genesis");
    let service = services
        .create(project.id, "api", "ghcr.io/acme/api:v1", ServiceSpec::default())
        .await
        .expect("service genesis");
    routes
        .create(service.id, "a.example.com", 80, false, None, None, None, None)
        .await
        .expect("route genesis");
    registries
        .create("ghcr", "ghcr.io", "robot", "registry-secret")
        .await
        .expect("registry genesis");

    let index = SearchIndex::open(database_client.clone())
        .await
        .expect("index ignition");
    (index, database_client)
}

async fn doc_count(database_client: &DbClient, entity_type: &str) -> i64 {
    let connection = database_client.connection().await.expect("pool allocation");
    let mut count_rows = connection
        .query(
            "SELECT COUNT(*) FROM search_docs WHERE entity_type = ?1",
            libsql::params![entity_type],
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
async fn certify_exactly_one_doc_per_canonical_entity() {
    let (index, database_client) = seeded_ground("mem_reindex_exact").await;

    index.reindex().await.expect("point-in-time rebuild");

    assert_eq!(doc_count(&database_client, "project").await, 1);
    assert_eq!(doc_count(&database_client, "service").await, 1);
    assert_eq!(doc_count(&database_client, "route").await, 1);
    assert_eq!(doc_count(&database_client, "registry").await, 1);

    // Catálogos embebidos: páginas, operaciones y ayuda siempre presentes.
    assert!(doc_count(&database_client, "page").await >= 10);
    assert!(doc_count(&database_client, "operation").await >= 5);
    assert_eq!(doc_count(&database_client, "help").await, 4);
}

#[tokio::test]
async fn certify_reindex_is_idempotent() {
    let (index, database_client) = seeded_ground("mem_reindex_idem").await;

    let first_pass = index.reindex().await.expect("first rebuild");
    let second_pass = index.reindex().await.expect("second rebuild");
    assert_eq!(first_pass, second_pass);

    // Ninguna llave duplicada tras pasadas repetidas.
    let connection = database_client.connection().await.expect("pool allocation");
    let mut duplicate_rows = connection
        .query(
            "SELECT COUNT(*) FROM (
                 SELECT entity_type, entity_id, COUNT(*) AS copies
                 FROM search_docs
                 GROUP BY entity_type, entity_id
                 HAVING copies > 1
             )",
            (),
        )
        .await
        .expect("duplicate sweep");
    let duplicates = duplicate_rows
        .next()
        .await
        .expect("cursor")
        .expect("count row")
        .get::<i64>(0)
        .expect("count column");
    assert_eq!(duplicates, 0);
}

#[tokio::test]
async fn certify_refresh_entity_repairs_incrementally() {
    let (index, database_client) = seeded_ground("mem_reindex_refresh").await;
    index.reindex().await.expect("baseline rebuild");

    // Mutación canónica directa: la proyección queda obsoleta a propósito.
    let connection = database_client.connection().await.expect("pool allocation");
    connection
        .execute("UPDATE projects SET branch = 'release' WHERE name = 'edge'", ())
        .await
        .expect("canonical mutation");

    let project_id: i64 = {
        let mut id_rows = connection
            .query("SELECT id FROM projects WHERE name = 'edge'", ())
            .await
            .expect("id sweep");
        id_rows
            .next()
            .await
            .expect("cursor")
            .expect("id row")
            .get(0)
            .expect("id column")
    };

    index
        .refresh_entity(helmsman_domain_models::SearchEntityType::Project, project_id)
        .await
        .expect("incremental repair");

    let mut body_rows = connection
        .query(
            "SELECT body FROM search_docs WHERE entity_type = 'project' AND entity_id = ?1",
            libsql::params![project_id],
        )
        .await
        .expect("body sweep");
    let projected_body: String = body_rows
        .next()
        .await
        .expect("cursor")
        .expect("doc row")
        .get(0)
        .expect("body column");
    assert!(projected_body.contains("release"));

    // Entidad purgada: la reparación elimina la proyección.
    connection
        .execute("DELETE FROM projects WHERE id = ?1", libsql::params![project_id])
        .await
        .expect("canonical purge");
    index
        .refresh_entity(helmsman_domain_models::SearchEntityType::Project, project_id)
        .await
        .expect("incremental purge");
    assert_eq!(doc_count(&database_client, "project").await, 0);
}
