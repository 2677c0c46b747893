// [tests/mirror/apps/controller/services/proxy_activation.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE ACTIVACIÓN DEL PIPELINE (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA RENDER -> VALIDATE -> ACTIVATE -> KEEP
 * =================================================================
 */

use async_trait::async_trait;
use helmsman_controller::adapters::{
    DetachedAcme, DetachedDns, DetachedDocker, ProxyAdapter, SystemClock,
};
use helmsman_controller::services::proxy_pipeline::reconcile_proxy;
use helmsman_controller::state::{AppState, Collaborators};
use helmsman_core_vault as vault;
use helmsman_infra_db::repositories::ServiceSpec;
use helmsman_infra_db::StoreError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Doble del proxy con veredicto de validación conmutable.
struct SwitchableProxy {
    accepting: AtomicBool,
}

impl SwitchableProxy {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            accepting: AtomicBool::new(true),
        })
    }

    fn reject_from_now_on(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProxyAdapter for SwitchableProxy {
    async fn validate(&self, _config_text: &str) -> Result<(), StoreError> {
        if self.accepting.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Collaborator("SYNTAX_REJECTED".into()))
        }
    }

    async fn install_and_reload(&self, _config_text: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

async fn ignite(tag: &str, proxy: Arc<SwitchableProxy>) -> Arc<AppState> {
    vault::install_master_key([7u8; 32]);
    let collaborators = Collaborators {
        docker: Arc::new(DetachedDocker),
        proxy,
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

async fn seed_route(state: &AppState) -> i64 {
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
        .routes
        .create(service.id, "a.example.com", 80, false, None, None, None, None)
        .await
        .expect("route sealed")
        .id
}

#[tokio::test]
async fn certify_cycle_activates_exactly_one_snapshot() {
    let proxy = SwitchableProxy::new();
    let state = ignite("mem_activation_single", proxy).await;
    seed_route(&state).await;

    reconcile_proxy(&state).await.expect("first cycle");

    let live = state
        .snapshots
        .active()
        .await
        .expect("active lookup")
        .expect("live snapshot");
    assert!(live.config_content.contains("a.example.com"));

    // Ciclo estable: mismo hash, ningún snapshot nuevo.
    reconcile_proxy(&state).await.expect("stable cycle");
    assert_eq!(state.snapshots.list(50).await.expect("listing").len(), 1);
}

#[tokio::test]
async fn certify_changed_inputs_rotate_the_snapshot() {
    let proxy = SwitchableProxy::new();
    let state = ignite("mem_activation_rotate", proxy).await;
    let route_id = seed_route(&state).await;

    reconcile_proxy(&state).await.expect("first cycle");
    let first_live = state
        .snapshots
        .active()
        .await
        .expect("lookup")
        .expect("live snapshot");

    // Mutación de ruta: el render difiere y un snapshot nuevo toma el relevo.
    state
        .routes
        .update(route_id, 8080, false, None, None, None)
        .await
        .expect("route mutation");
    reconcile_proxy(&state).await.expect("rotation cycle");

    let second_live = state
        .snapshots
        .active()
        .await
        .expect("lookup")
        .expect("live snapshot");
    assert_ne!(second_live.id, first_live.id);
    assert_ne!(second_live.config_hash, first_live.config_hash);

    // Invariante: a lo sumo una fila activa tras la rotación.
    let snapshots = state.snapshots.list(50).await.expect("listing");
    assert_eq!(snapshots.iter().filter(|snapshot| snapshot.active).count(), 1);
}

#[tokio::test]
async fn certify_validation_failure_keeps_previous_snapshot() {
    let proxy = SwitchableProxy::new();
    let state = ignite("mem_activation_reject", proxy.clone()).await;
    let route_id = seed_route(&state).await;

    reconcile_proxy(&state).await.expect("first cycle");
    let previous_live = state
        .snapshots
        .active()
        .await
        .expect("lookup")
        .expect("live snapshot");

    // El colaborador rechaza la configuración candidata.
    proxy.reject_from_now_on();
    state
        .routes
        .update(route_id, 9090, false, None, None, None)
        .await
        .expect("route mutation");
    reconcile_proxy(&state).await.expect("rejected cycle");

    // El snapshot previo permanece activo y el fallo quedó sellado.
    let still_live = state
        .snapshots
        .active()
        .await
        .expect("lookup")
        .expect("live snapshot");
    assert_eq!(still_live.id, previous_live.id);

    let evidence = state.audit.list(None).await.expect("audit sweep");
    assert!(evidence
        .iter()
        .any(|entry| entry.action == "proxy.validation_failed"));
}
