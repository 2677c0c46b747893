// [tests/mirror/apps/controller/services/reconcile_loop.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL LAZO L1 (V2.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DESEADO-VS-REAL CON DOCKER SIMULADO
 * =================================================================
 */

use async_trait::async_trait;
use futures::stream::BoxStream;
use helmsman_controller::adapters::{
    ContainerSpec, DetachedAcme, DetachedDns, DetachedProxy, DockerAdapter, ExitEvent,
    SystemClock,
};
use helmsman_controller::services::reconciler::reconcile_once;
use helmsman_controller::state::{AppState, Collaborators};
use helmsman_core_vault as vault;
use helmsman_domain_models::DesiredState;
use helmsman_infra_db::repositories::ServiceSpec;
use helmsman_infra_db::StoreError;
use std::sync::{Arc, Mutex};

/// Doble de Docker que registra cada orden recibida.
struct RecordingDocker {
    ensured: Mutex<Vec<ContainerSpec>>,
    stopped: Mutex<Vec<String>>,
}

impl RecordingDocker {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            ensured: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DockerAdapter for RecordingDocker {
    async fn ensure_container(&self, spec: &ContainerSpec) -> Result<String, StoreError> {
        self.ensured.lock().expect("recording lock").push(spec.clone());
        Ok(format!("cont-{}", spec.service_id))
    }

    async fn stop(&self, container_id: &str) -> Result<(), StoreError> {
        self.stopped
            .lock()
            .expect("recording lock")
            .push(container_id.to_string());
        Ok(())
    }

    fn observe_exits(&self) -> BoxStream<'static, ExitEvent> {
        Box::pin(futures::stream::pending())
    }
}

async fn ignite(tag: &str, docker: Arc<RecordingDocker>) -> Arc<AppState> {
    vault::install_master_key([7u8; 32]);
    let collaborators = Collaborators {
        docker,
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
async fn certify_running_intent_materializes_container() {
    let docker = RecordingDocker::new();
    let state = ignite("mem_reconcile_run", docker.clone()).await;

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

    reconcile_once(&state).await;

    // La orden viajó con la especificación completa del proyecto.
    let ensured = docker.ensured.lock().expect("recording lock");
    assert_eq!(ensured.len(), 1);
    assert_eq!(ensured[0].network, project.network_name);
    assert_eq!(ensured[0].container_name, format!("{}_api", project.network_name));

    // La identidad observada quedó sellada en el Ledger.
    let observed = state.services.get(service.id).await.expect("reread");
    assert_eq!(observed.container_id.as_deref(), Some("cont-1"));
}

#[tokio::test]
async fn certify_stopped_intent_halts_container() {
    let docker = RecordingDocker::new();
    let state = ignite("mem_reconcile_stop", docker.clone()).await;

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

    // Materialización previa.
    state
        .services
        .set_desired_state(service.id, DesiredState::Running)
        .await
        .expect("running intent");
    reconcile_once(&state).await;

    // Intención detenida: el siguiente tick ordena la parada.
    state
        .services
        .set_desired_state(service.id, DesiredState::Stopped)
        .await
        .expect("stopped intent");
    reconcile_once(&state).await;

    let stopped = docker.stopped.lock().expect("recording lock");
    assert_eq!(stopped.as_slice(), ["cont-1".to_string()]);

    let observed = state.services.get(service.id).await.expect("reread");
    assert_eq!(observed.container_id, None);
}

#[tokio::test]
async fn certify_reconcile_is_idempotent_per_tick() {
    let docker = RecordingDocker::new();
    let state = ignite("mem_reconcile_idem", docker.clone()).await;

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

    reconcile_once(&state).await;
    reconcile_once(&state).await;

    // El adaptador es idempotente: dos ticks, misma identidad observada.
    assert_eq!(docker.ensured.lock().expect("recording lock").len(), 2);
    let observed = state.services.get(service.id).await.expect("reread");
    assert_eq!(observed.container_id.as_deref(), Some("cont-1"));
}
