// [apps/controller/src/services/health_sentinel.rs]
// =================================================================
// APARATO: HEALTH SENTINEL DAEMON (V5.3 - PROBE AUTODETECTION)
// CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
// RESPONSABILIDAD: SONDAS DE SALUD PERIÓDICAS (L2)
//
// VISION HIPER-HOLÍSTICA:
// 1. PROBE CLASSES: postgres*/mysql*/mariadb*/redis* reciben un ping de
//    alcanzabilidad TCP; el resto una sonda HTTP GET.
// 2. ROUTE-AWARE URLS: Con ruta publicada la sonda viaja por la URL
//    externa; sin ruta, por localhost y el puerto host del servicio.
// 3. HARD TIMEOUT: 3 segundos por sonda; el veredicto siempre sella
//    last_probe_at, incluso ante fallo del colaborador.
// =================================================================

use crate::state::AppState;
use helmsman_domain_models::{DesiredState, HealthStatus, ProbeKind, Route, Service};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

/// Presupuesto duro de cada sonda.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Lanza el daemon centinela de salud con el período indicado.
pub fn spawn_health_sentinel(
    application_state: Arc<AppState>,
    mut shutdown_signal: watch::Receiver<bool>,
    tick_period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sentinel_ticker = interval(tick_period);
        let probe_client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .expect("probe client assembly");

        info!("🩺 [SENTINEL_ACTIVE]: Health probing daemon initiated.");

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    info!("🩺 [SENTINEL_HALT]: Shutdown signal honored.");
                    break;
                }
                _ = sentinel_ticker.tick() => {
                    probe_all(&application_state, &probe_client).await;
                }
            }
        }
    })
}

/// Una pasada de sondeo sobre todos los servicios vigilables.
pub async fn probe_all(application_state: &AppState, probe_client: &reqwest::Client) {
    let service_collection = match application_state.services.list_all().await {
        Ok(collection) => collection,
        Err(list_fault) => {
            warn!("🩺 [SENTINEL_LIST_FAULT]: {}", list_fault);
            return;
        }
    };

    for service in service_collection {
        // Solo servicios con intención de ejecución y ruta de salud declarada.
        if service.desired_state != DesiredState::Running || service.health_path.is_none() {
            continue;
        }

        let verdict = execute_probe(application_state, probe_client, &service).await;
        let probe_instant = application_state.clock.now();

        if let Err(record_fault) = application_state
            .services
            .record_probe(service.id, verdict, probe_instant)
            .await
        {
            warn!("🩺 [PROBE_RECORD_FAULT]: {}", record_fault);
        }
    }
}

/// Ejecuta la sonda adecuada a la clase de imagen del servicio.
async fn execute_probe(
    application_state: &AppState,
    probe_client: &reqwest::Client,
    service: &Service,
) -> HealthStatus {
    match ProbeKind::detect(&service.image) {
        ProbeKind::Http => execute_http_probe(application_state, probe_client, service).await,
        // Clases de base de datos: ping de alcanzabilidad TCP con el
        // mismo presupuesto temporal.
        ProbeKind::Postgres | ProbeKind::Mysql | ProbeKind::Redis => {
            execute_tcp_probe(service).await
        }
    }
}

async fn execute_http_probe(
    application_state: &AppState,
    probe_client: &reqwest::Client,
    service: &Service,
) -> HealthStatus {
    let health_path = service.health_path.as_deref().unwrap_or("/");

    // Con ruta publicada, la sonda viaja por la URL externa.
    let probe_url = match application_state.routes.list_by_service(service.id).await {
        Ok(route_collection) => match route_collection.first() {
            Some(route) => external_probe_url(route, health_path),
            None => match localhost_probe_url(service, health_path) {
                Some(url) => url,
                None => {
                    debug!("🩺 [PROBE_UNREACHABLE]: Service {} has no host port.", service.name);
                    return HealthStatus::Fail;
                }
            },
        },
        Err(route_fault) => {
            warn!("🩺 [ROUTE_LOOKUP_FAULT]: {}", route_fault);
            return HealthStatus::Fail;
        }
    };

    match probe_client.get(&probe_url).send().await {
        Ok(response) if response.status().is_success() => HealthStatus::Ok,
        Ok(_) | Err(_) => HealthStatus::Fail,
    }
}

async fn execute_tcp_probe(service: &Service) -> HealthStatus {
    let host_port = match service.ports.first() {
        Some(binding) => binding.host,
        None => return HealthStatus::Fail,
    };

    match timeout(
        PROBE_TIMEOUT,
        TcpStream::connect(("127.0.0.1", host_port as u16)),
    )
    .await
    {
        Ok(Ok(_)) => HealthStatus::Ok,
        Ok(Err(_)) | Err(_) => HealthStatus::Fail,
    }
}

fn external_probe_url(route: &Route, health_path: &str) -> String {
    let scheme = if route.tls { "https" } else { "http" };
    format!("{}://{}{}", scheme, route.domain, normalize_path(health_path))
}

fn localhost_probe_url(service: &Service, health_path: &str) -> Option<String> {
    service
        .ports
        .first()
        .map(|binding| format!("http://localhost:{}{}", binding.host, normalize_path(health_path)))
}

fn normalize_path(health_path: &str) -> String {
    if health_path.starts_with('/') {
        health_path.to_string()
    } else {
        format!("/{}", health_path)
    }
}
