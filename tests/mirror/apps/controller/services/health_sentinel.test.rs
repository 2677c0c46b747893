// [tests/mirror/apps/controller/services/health_sentinel.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL CENTINELA DE SALUD (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL LAZO L2 SIN RED EXTERNA
 * =================================================================
 */

use helmsman_controller::adapters::{
    DetachedAcme, DetachedDns, DetachedDocker, DetachedProxy, SystemClock,
};
use helmsman_controller::services::health_sentinel::probe_all;
use helmsman_controller::state::{AppState, Collaborators};
use helmsman_core_vault as vault;
use helmsman_domain_models::{DesiredState, HealthStatus};
use helmsman_infra_db::repositories::ServiceSpec;
use std::sync::Arc;
use std::time::Duration;

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

fn probe_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .expect("probe client assembly")
}

#[tokio::test]
async fn certify_unreachable_service_fails_and_seals_probe_time() {
    let state = ignite("mem_sentinel_unreachable").await;

    let project = state
        .projects
        .create("edge", None, None, None)
        .await
        .expect("project genesis");
    // Sin rutas ni puertos host: la sonda no tiene destino.
    let service = state
        .services
        .create(
            project.id,
            "api",
            "ghcr.io/acme/api:v1",
            ServiceSpec {
                health_path: Some("/healthz".into()),
                ..ServiceSpec::default()
            },
        )
        .await
        .expect("service genesis");
    state
        .services
        .set_desired_state(service.id, DesiredState::Running)
        .await
        .expect("running intent");

    probe_all(&state, &probe_client()).await;

    let observed = state.services.get(service.id).await.expect("reread");
    assert_eq!(observed.health_status, HealthStatus::Fail);
    assert!(observed.last_probe_at.is_some());
}

#[tokio::test]
async fn certify_services_without_health_path_are_skipped() {
    let state = ignite("mem_sentinel_skip").await;

    let project = state
        .projects
        .create("edge", None, None, None)
        .await
        .expect("project genesis");
    let service = state
        .services
        .create(project.id, "api", "ghcr.io/acme/api:v1", ServiceSpec::default())
        .await
        .expect("service genesis");
    state
        .services
        .set_desired_state(service.id, DesiredState::Running)
        .await
        .expect("running intent");

    probe_all(&state, &probe_client()).await;

    // Sin health_path declarado el centinela no emite veredicto alguno.
    let observed = state.services.get(service.id).await.expect("reread");
    assert_eq!(observed.health_status, HealthStatus::Unknown);
    assert_eq!(observed.last_probe_at, None);
}

#[tokio::test]
async fn certify_stopped_services_are_not_probed() {
    let state = ignite("mem_sentinel_stopped").await;

    let project = state
        .projects
        .create("edge", None, None, None)
        .await
        .expect("project genesis");
    let service = state
        .services
        .create(
            project.id,
            "api",
            "ghcr.io/acme/api:v1",
            ServiceSpec {
                health_path: Some("/healthz".into()),
                ..ServiceSpec::default()
            },
        )
        .await
        .expect("service genesis");

    // desired_state permanece stopped.
    probe_all(&state, &probe_client()).await;

    let observed = state.services.get(service.id).await.expect("reread");
    assert_eq!(observed.last_probe_at, None);
}
