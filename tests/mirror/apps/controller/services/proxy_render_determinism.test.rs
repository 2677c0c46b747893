// [tests/mirror/apps/controller/services/proxy_render_determinism.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE DETERMINISMO DEL RENDER (V2.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL ORDEN TOTAL Y LA IDENTIDAD BYTE-PERFECTA
 * =================================================================
 */

use helmsman_controller::adapters::{
    DetachedAcme, DetachedDns, DetachedDocker, DetachedProxy, SystemClock,
};
use helmsman_controller::services::proxy_pipeline::{content_hash, render};
use helmsman_controller::state::{AppState, Collaborators};
use helmsman_core_vault as vault;
use helmsman_infra_db::repositories::ServiceSpec;
use std::collections::HashMap;
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

/// Siembra el escenario: s1 en p1 con ruta TLS, s2 en p2 con ruta plana.
async fn seed_routes(state: &AppState) {
    let p1 = state
        .projects
        .create("p1", None, None, None)
        .await
        .expect("p1 genesis");
    let p2 = state
        .projects
        .create("p2", None, None, None)
        .await
        .expect("p2 genesis");

    let s1 = state
        .services
        .create(p1.id, "s1", "ghcr.io/acme/s1:v1", ServiceSpec::default())
        .await
        .expect("s1 genesis");
    let s2 = state
        .services
        .create(p2.id, "s2", "ghcr.io/acme/s2:v1", ServiceSpec::default())
        .await
        .expect("s2 genesis");

    // La ruta TLS referencia un certificado inexistente a propósito.
    state
        .routes
        .create(s1.id, "a.example.com", 80, true, Some("/api/v1".into()), Some(42), None, None)
        .await
        .expect("a route sealed");
    state
        .routes
        .create(s2.id, "z.example.com", 80, false, None, None, None, None)
        .await
        .expect("z route sealed");
}

#[tokio::test]
async fn certify_route_catalog_total_order() {
    let state = ignite("mem_render_order").await;
    seed_routes(&state).await;

    // El catálogo emite orden total por dominio.
    let catalog = state.routes.get_all_routes().await.expect("catalog sweep");
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].domain, "a.example.com");
    assert_eq!(catalog[1].domain, "z.example.com");

    // Las entradas de render preservan el mismo orden.
    let inputs = state.routes.render_inputs().await.expect("render inputs");
    assert_eq!(inputs[0].domain, "a.example.com");
    assert_eq!(inputs[0].path.as_deref(), Some("/api/v1"));
    assert_eq!(inputs[1].domain, "z.example.com");

    // El texto renderizado respeta el orden del catálogo.
    let rendered = render(&inputs, &HashMap::new());
    let first_position = rendered.find("a.example.com").expect("a present");
    let second_position = rendered.find("z.example.com").expect("z present");
    assert!(first_position < second_position);
}

#[tokio::test]
async fn certify_render_identity_across_runs() {
    let state = ignite("mem_render_identity").await;
    seed_routes(&state).await;

    let inputs = state.routes.render_inputs().await.expect("render inputs");

    let first_render = render(&inputs, &HashMap::new());
    let second_render = render(&inputs, &HashMap::new());

    assert_eq!(first_render, second_render);
    assert_eq!(content_hash(&first_render), content_hash(&second_render));

    // Re-lectura completa del Ledger: mismas entradas, mismo byte-stream.
    let reread_inputs = state.routes.render_inputs().await.expect("reread inputs");
    assert_eq!(render(&reread_inputs, &HashMap::new()), first_render);
}

#[tokio::test]
async fn certify_dangling_certificate_renders_plain() {
    let state = ignite("mem_render_dangling").await;
    seed_routes(&state).await;

    let inputs = state.routes.render_inputs().await.expect("render inputs");

    // El certificado 42 no existe: la ruta TLS degrada a HTTP plano.
    let mut certificate_cache = HashMap::new();
    certificate_cache.insert(42, None);

    let rendered = render(&inputs, &certificate_cache);
    assert!(!rendered.contains("ssl_certificate"));
    assert!(rendered.contains("server_name a.example.com;"));
}
