// [tests/mirror/apps/controller/services/crash_loop_flow.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL FLUJO DE CRASH-LOOP (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA SALIDAS OBSERVADAS -> FSM -> EVIDENCIA
 * =================================================================
 */

use helmsman_controller::adapters::{
    DetachedAcme, DetachedDns, DetachedDocker, DetachedProxy, SystemClock,
};
use helmsman_controller::services::reconciler::register_exit;
use helmsman_controller::state::{AppState, Collaborators};
use helmsman_core_vault as vault;
use helmsman_domain_models::DesiredState;
use helmsman_infra_db::repositories::ServiceSpec;
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
async fn certify_observed_exits_drive_the_fsm() {
    let state = ignite("mem_crash_flow").await;

    let project = state
        .projects
        .create("p", None, None, None)
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

    // Cinco colapsos observados; el contenedor renace entre cada uno.
    for _ in 0..5 {
        state
            .services
            .record_observed_container(service.id, Some("c-alpha".into()))
            .await
            .expect("container observation");
        register_exit(&state, "c-alpha", 1).await;
    }

    let held = state.services.get(service.id).await.expect("held reread");
    assert!(held.crash_looping);
    assert_eq!(held.desired_state, DesiredState::Stopped);
    assert_eq!(held.restart_count, 5);

    // El disparo dejó evidencia en el rastro de auditoría.
    let evidence = state.audit.list(None).await.expect("audit sweep");
    assert!(evidence
        .iter()
        .any(|entry| entry.action == "service.crash_loop"));

    // Desbloqueo: única salida legal.
    state.services.unlock(service.id).await.expect("release seal");
    let released = state.services.get(service.id).await.expect("released reread");
    assert!(!released.crash_looping);
    assert_eq!(released.desired_state, DesiredState::Running);
    assert_eq!(released.restart_count, 0);
    assert_eq!(released.restart_window_at, None);
}

#[tokio::test]
async fn certify_orphan_exits_are_ignored() {
    let state = ignite("mem_crash_orphan").await;

    // Sin servicio propietario: la salida no colapsa ni escribe.
    register_exit(&state, "ghost-container", 1).await;
    assert!(state.audit.list(None).await.expect("audit sweep").is_empty());
}
