// [tests/mirror/apps/controller/services/index_maintainer.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL MANTENEDOR DE ÍNDICE (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL CONSUMO POST-COMMIT Y LA REPARACIÓN
 * =================================================================
 */

use helmsman_controller::adapters::{
    DetachedAcme, DetachedDns, DetachedDocker, DetachedProxy, SystemClock,
};
use helmsman_controller::services::index_maintainer::{consume_job, run_full_repair};
use helmsman_controller::state::{AppState, Collaborators};
use helmsman_core_vault as vault;
use helmsman_domain_models::SearchEntityType;
use helmsman_infra_db::IndexJob;
use helmsman_infra_search::SearchFilter;
use std::sync::Arc;

async fn ignite(tag: &str) -> Arc<AppState> {
    vault::install_master_key([7u8; 32]);
    let collaborators = Collaborators {
        docker: Arc::new(DetachedDocker),
        proxy: Arc::new(DetachedProxy),
        acme: Arc::new(DetachedAcme),
        dns: Arc::new(DetachedDns),
        clock: Arc::new(SystemClock),
    };
    let (state, _index_queue) = AppState::assemble(
        &format!("file:{}?mode=memory&cache=shared", tag),
        collaborators,
    )
    .await
    .expect("CRITICAL_FAULT: nexus assembly failed");
    state
}

#[tokio::test]
async fn certify_incremental_jobs_converge_the_index() {
    let state = ignite("mem_maintainer_jobs").await;

    let project = state
        .projects
        .create("edge", None, None, None)
        .await
        .expect("project genesis");

    // Trabajo incremental de upsert: la proyección nace.
    consume_job(
        &state,
        IndexJob::Upsert {
            entity_type: SearchEntityType::Project,
            entity_id: project.id,
        },
    )
    .await;

    let filter = SearchFilter {
        entity_type: Some(SearchEntityType::Project),
        allow_basic: true,
        limit: Some(10),
        ..SearchFilter::default()
    };
    let (hits, total) = state.search.query("edge", &filter).await.expect("query verdict");
    assert_eq!(total, 1);
    assert_eq!(hits[0].doc.title, "edge");

    // Trabajo de borrado: la proyección se incinera.
    consume_job(
        &state,
        IndexJob::Delete {
            entity_type: SearchEntityType::Project,
            entity_id: project.id,
        },
    )
    .await;
    let (_, total_after) = state.search.query("edge", &filter).await.expect("query verdict");
    assert_eq!(total_after, 0);
}

#[tokio::test]
async fn certify_full_repair_restores_coherence() {
    let state = ignite("mem_maintainer_repair").await;

    state
        .projects
        .create("edge", None, None, None)
        .await
        .expect("project genesis");

    // Sin trabajos incrementales consumidos: la reparación total proyecta.
    run_full_repair(&state).await;

    let filter = SearchFilter {
        allow_basic: true,
        limit: Some(50),
        ..SearchFilter::default()
    };
    let (_, total) = state.search.query("", &filter).await.expect("match-all verdict");

    // Proyecto + catálogos embebidos (páginas, operaciones, ayuda).
    assert!(total > 20);
}
