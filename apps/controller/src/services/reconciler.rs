// INICIO DEL ARCHIVO [apps/controller/src/services/reconciler.rs]
/*!
 * =================================================================
 * APARATO: STATE RECONCILER DAEMON (V7.2 - DESIRED VS ACTUAL)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: CONVERGENCIA CONTENEDORES <- ESTADO DESEADO (L1)
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. IDEMPOTENT TICKS: Cada ciclo re-deriva la especificación completa y
 *    delega en ensure_container; el adaptador es idempotente.
 * 2. COLLABORATOR RESILIENCE: Un fallo de Docker se registra y el lazo
 *    continúa en el siguiente tick; el proceso jamás colapsa.
 * 3. EXIT OBSERVER: El flujo de salidas alimenta la FSM de crash-loop
 *    (L3) a través de escrituras idempotentes de fila completa.
 *
 * # Mathematical Proof (Convergence):
 * Con adaptador idempotente y veredictos de FSM deterministas, el estado
 * observado converge al deseado en un número finito de ticks salvo
 * fallos persistentes del colaborador, que quedan acotados al servicio.
 * =================================================================
 */

use crate::adapters::ContainerSpec;
use crate::state::AppState;
use futures_util::StreamExt;
use helmsman_domain_models::{DesiredState, Project};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Lanza el daemon de reconciliación L1 con el período indicado.
pub fn spawn_reconciler(
    application_state: Arc<AppState>,
    mut shutdown_signal: watch::Receiver<bool>,
    tick_period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reconcile_ticker = interval(tick_period);
        info!("🔄 [RECONCILER_ACTIVE]: Desired-vs-actual daemon initiated.");

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    info!("🔄 [RECONCILER_HALT]: Shutdown signal honored.");
                    break;
                }
                _ = reconcile_ticker.tick() => {
                    reconcile_once(&application_state).await;
                }
            }
        }
    })
}

/// Lanza el observador del flujo de salidas (alimenta la FSM L3).
pub fn spawn_exit_observer(
    application_state: Arc<AppState>,
    mut shutdown_signal: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut exit_stream = application_state.docker.observe_exits();
        info!("👁️ [EXIT_OBSERVER_ACTIVE]: Container exit stream attached.");

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    info!("👁️ [EXIT_OBSERVER_HALT]: Shutdown signal honored.");
                    break;
                }
                observed = exit_stream.next() => {
                    match observed {
                        Some(exit_event) => {
                            register_exit(&application_state, &exit_event.container_id, exit_event.exit_code).await;
                        }
                        None => {
                            warn!("👁️ [EXIT_STREAM_CLOSED]: Collaborator stream ended.");
                            break;
                        }
                    }
                }
            }
        }
    })
}

/// Registra una salida observada contra el servicio propietario.
pub async fn register_exit(application_state: &AppState, container_id: &str, exit_code: i64) {
    let owner = match application_state.services.get_by_container(container_id).await {
        Ok(Some(service)) => service,
        Ok(None) => {
            debug!("👁️ [EXIT_ORPHAN]: Container {} has no owning service.", container_id);
            return;
        }
        Err(lookup_fault) => {
            warn!("👁️ [EXIT_LOOKUP_FAULT]: {}", lookup_fault);
            return;
        }
    };

    let observation_instant = application_state.clock.now();
    match application_state
        .services
        .record_exit(owner.id, exit_code, observation_instant)
        .await
    {
        Ok(verdict) if verdict.crash_looping => {
            application_state
                .record_audit(
                    "reconciler",
                    "service.crash_loop",
                    "service",
                    &owner.id.to_string(),
                    serde_json::json!({ "restart_count": verdict.restart_count, "exit_code": exit_code }),
                )
                .await;
        }
        Ok(_) => {}
        Err(record_fault) => warn!("👁️ [EXIT_RECORD_FAULT]: {}", record_fault),
    }
}

/**
 * Un ciclo completo de reconciliación sobre todos los servicios.
 * Expuesto para el Proving Grounds; el daemon lo invoca por tick.
 */
pub async fn reconcile_once(application_state: &AppState) {
    let service_collection = match application_state.services.list_all().await {
        Ok(collection) => collection,
        Err(list_fault) => {
            warn!("🔄 [RECONCILE_LIST_FAULT]: {}", list_fault);
            return;
        }
    };

    // Cache de proyectos por tick: evita N lecturas del mismo propietario.
    let mut project_cache: HashMap<i64, Project> = HashMap::new();

    for service in service_collection {
        match service.desired_state {
            DesiredState::Running => {
                // Los servicios retenidos ya portan desired_state = stopped;
                // este brazo solo ve intención de ejecución legítima.
                let project = match project_cache.get(&service.project_id) {
                    Some(cached) => cached.clone(),
                    None => match application_state.projects.get(service.project_id).await {
                        Ok(found) => {
                            project_cache.insert(service.project_id, found.clone());
                            found
                        }
                        Err(project_fault) => {
                            warn!("🔄 [PROJECT_LOOKUP_FAULT]: {}", project_fault);
                            continue;
                        }
                    },
                };

                match assemble_container_spec(application_state, &project, &service).await {
                    Ok(specification) => {
                        match application_state.docker.ensure_container(&specification).await {
                            Ok(container_id) => {
                                if service.container_id.as_deref() != Some(container_id.as_str()) {
                                    if let Err(record_fault) = application_state
                                        .services
                                        .record_observed_container(service.id, Some(container_id))
                                        .await
                                    {
                                        warn!("🔄 [OBSERVATION_FAULT]: {}", record_fault);
                                    }
                                }
                            }
                            Err(collaborator_fault) => {
                                debug!(
                                    "🔄 [ENSURE_DEGRADED]: Service {} deferred: {}",
                                    service.name, collaborator_fault
                                );
                            }
                        }
                    }
                    Err(spec_fault) => {
                        warn!("🔄 [SPEC_FAULT]: Service {}: {}", service.name, spec_fault);
                    }
                }
            }
            DesiredState::Stopped => {
                if let Some(container_id) = service.container_id.as_deref() {
                    match application_state.docker.stop(container_id).await {
                        Ok(()) => {
                            if let Err(record_fault) = application_state
                                .services
                                .record_observed_container(service.id, None)
                                .await
                            {
                                warn!("🔄 [OBSERVATION_FAULT]: {}", record_fault);
                            }
                        }
                        Err(collaborator_fault) => {
                            debug!(
                                "🔄 [STOP_DEGRADED]: Service {} deferred: {}",
                                service.name, collaborator_fault
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Deriva la especificación de contenedor con el entorno ya resuelto.
async fn assemble_container_spec(
    application_state: &AppState,
    project: &Project,
    service: &helmsman_domain_models::Service,
) -> Result<ContainerSpec, helmsman_infra_db::StoreError> {
    // 1. ENTORNO EFECTIVO: inline del spec + superposición gestionada
    // (los secretos se descifran únicamente aquí, en memoria).
    let mut effective_environment = service.env.clone();
    let managed_overlay = application_state.env_vars.resolved_env(service.id).await?;
    effective_environment.extend(managed_overlay);

    // 2. CREDENCIALES DE REGISTRO, SI EL SERVICIO LAS REFERENCIA
    let registry_credentials = match service.registry_id {
        Some(registry_id) => Some(
            application_state
                .registries
                .credentials(registry_id)
                .await?,
        ),
        None => None,
    };

    Ok(ContainerSpec {
        service_id: service.id,
        container_name: format!("{}_{}", project.network_name, service.name),
        image: service.image.clone(),
        env: effective_environment,
        ports: service.ports.clone(),
        volumes: service.volumes.clone(),
        network: project.network_name.clone(),
        registry_credentials,
    })
}
// FIN DEL ARCHIVO [apps/controller/src/services/reconciler.rs]
