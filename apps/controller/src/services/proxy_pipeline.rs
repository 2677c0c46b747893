// INICIO DEL ARCHIVO [apps/controller/src/services/proxy_pipeline.rs]
/*!
 * =================================================================
 * APARATO: PROXY PIPELINE (V6.4 - DETERMINISTIC RENDER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: RENDER -> HASH -> VALIDATE -> ACTIVATE -> RELOAD (C5)
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. BYTE-PERFECT RENDER: Entradas idénticas (orden total por dominio y
 *    path) producen texto idéntico; sin timestamps, PIDs ni azar.
 * 2. DANGLING TOLERANCE: Una ruta que referencia un certificado purgado
 *    degrada a "sin certificado" y el render jamás falla.
 * 3. SAFE ACTIVATION: Ante fallo de validación el snapshot previo
 *    permanece activo y el fallo queda sellado en el rastro de auditoría.
 *
 * # Mathematical Proof (Snapshot Monotonicity):
 * El hash decide la inserción: un snapshot nuevo solo nace cuando el
 * contenido difiere del activo, por lo que la cadena de snapshots es
 * libre de duplicados consecutivos.
 * =================================================================
 */

use crate::state::AppState;
use helmsman_domain_models::{Certificate, CertificateStatus};
use helmsman_infra_db::repositories::RenderInput;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Lanza el daemon del pipeline: drena la bandera dirty por tick.
pub fn spawn_proxy_pipeline(
    application_state: Arc<AppState>,
    mut shutdown_signal: watch::Receiver<bool>,
    tick_period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut pipeline_ticker = interval(tick_period);
        info!("📡 [PIPELINE_ACTIVE]: Proxy render daemon initiated.");

        // Render inicial: repara cualquier deriva previa al arranque.
        if let Err(cycle_fault) = reconcile_proxy(&application_state).await {
            warn!("📡 [PIPELINE_BOOT_FAULT]: {}", cycle_fault);
        }

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    info!("📡 [PIPELINE_HALT]: Shutdown signal honored.");
                    break;
                }
                _ = pipeline_ticker.tick() => {
                    if application_state.bridge.take_proxy_dirty() {
                        if let Err(cycle_fault) = reconcile_proxy(&application_state).await {
                            warn!("📡 [PIPELINE_CYCLE_FAULT]: {}", cycle_fault);
                            // La deriva persiste; el próximo tick reintenta.
                            application_state.bridge.mark_proxy_dirty();
                        }
                    }
                }
            }
        }
    })
}

/**
 * Ciclo completo del pipeline: render determinista, hash, y si difiere
 * del snapshot activo: insertar -> validar -> activar -> recargar.
 */
pub async fn reconcile_proxy(
    application_state: &AppState,
) -> Result<(), helmsman_infra_db::StoreError> {
    // 1. ENTRADAS DETERMINISTAS (orden total por dominio, path)
    let render_inputs = application_state.routes.render_inputs().await?;

    // 2. CERTIFICADOS REFERENCIADOS: una búsqueda por id, cacheada.
    let mut certificate_cache: HashMap<i64, Option<Certificate>> = HashMap::new();
    for input in &render_inputs {
        if let Some(certificate_id) = input.certificate_id {
            if !certificate_cache.contains_key(&certificate_id) {
                let resolved = application_state
                    .certificates
                    .try_get(certificate_id)
                    .await?;
                certificate_cache.insert(certificate_id, resolved);
            }
        }
    }

    // 3. RENDER Y HASH
    let config_content = render(&render_inputs, &certificate_cache);
    let config_hash = content_hash(&config_content);

    let active_snapshot = application_state.snapshots.active().await?;
    if let Some(active) = &active_snapshot {
        if active.config_hash == config_hash {
            debug!("📡 [PIPELINE_STABLE]: Active snapshot already matches render.");
            return Ok(());
        }
    }

    // 4. INSERCIÓN INACTIVA + VALIDACIÓN EXTERNA
    let candidate = application_state
        .snapshots
        .insert(&config_hash, &config_content)
        .await?;

    match application_state.proxy.validate(&config_content).await {
        Ok(()) => {
            application_state.snapshots.activate(candidate.id).await?;

            if let Err(reload_fault) = application_state
                .proxy
                .install_and_reload(&config_content)
                .await
            {
                warn!("📡 [RELOAD_DEGRADED]: Snapshot {} active, reload deferred: {}",
                    candidate.id, reload_fault);
            }

            application_state
                .record_audit(
                    "proxy-pipeline",
                    "proxy.snapshot_activated",
                    "proxy_snapshot",
                    &candidate.id.to_string(),
                    serde_json::json!({ "config_hash": config_hash }),
                )
                .await;
            info!("📡 [PIPELINE_SEALED]: Snapshot {} activated ({}).", candidate.id, &config_hash[..12]);
        }
        Err(validation_fault) => {
            // El snapshot previo permanece activo; el fallo queda sellado.
            warn!("📡 [VALIDATION_REJECTED]: Snapshot {} kept inactive: {}",
                candidate.id, validation_fault);
            application_state
                .record_audit(
                    "proxy-pipeline",
                    "proxy.validation_failed",
                    "proxy_snapshot",
                    &candidate.id.to_string(),
                    serde_json::json!({ "fault": validation_fault.to_string() }),
                )
                .await;
        }
    }

    Ok(())
}

/**
 * Render determinista del texto de configuración del proxy inverso.
 *
 * Las entradas ya llegan en orden total (dominio ASC, path ASC); el
 * texto excluye métricas vivas, marcas temporales y valores aleatorios.
 */
pub fn render(
    render_inputs: &[RenderInput],
    certificate_cache: &HashMap<i64, Option<Certificate>>,
) -> String {
    let mut configuration = String::new();
    configuration.push_str("# helmsman reverse proxy configuration\n");

    for input in render_inputs {
        // Un certificado colgante o no-activo degrada a "sin certificado".
        let live_certificate = input
            .certificate_id
            .and_then(|certificate_id| certificate_cache.get(&certificate_id))
            .and_then(|resolved| resolved.as_ref())
            .filter(|certificate| certificate.status == CertificateStatus::Active);

        let tls_enabled = input.tls && live_certificate.is_some();
        let location_path = input.path.as_deref().unwrap_or("/");

        configuration.push_str("\nserver {\n");
        configuration.push_str(&format!("    server_name {};\n", input.domain));

        if tls_enabled {
            let certificate = live_certificate.expect("tls_enabled implies live certificate");
            configuration.push_str("    listen 443 ssl;\n");
            configuration.push_str(&format!(
                "    ssl_certificate /var/lib/helmsman/certs/{}/fullchain.pem;\n",
                certificate.id
            ));
            configuration.push_str(&format!(
                "    ssl_certificate_key /var/lib/helmsman/certs/{}/privkey.pem;\n",
                certificate.id
            ));
        } else {
            configuration.push_str("    listen 80;\n");
        }

        configuration.push_str(&format!("    location {} {{\n", location_path));
        configuration.push_str(&format!(
            "        proxy_pass http://{}.{}:{};\n",
            input.service_name, input.network_name, input.port
        ));
        configuration.push_str("        proxy_set_header Host $host;\n");
        configuration.push_str("        proxy_set_header X-Forwarded-For $remote_addr;\n");
        configuration.push_str("    }\n");

        // Fragmento opaco del operador, inyectado tal cual.
        if let Some(extra_fragment) = input.proxy_config.as_deref() {
            for fragment_line in extra_fragment.lines() {
                configuration.push_str(&format!("    {}\n", fragment_line));
            }
        }

        configuration.push_str("}\n");
    }

    configuration
}

/// SHA-256 hex del texto de configuración.
pub fn content_hash(config_content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config_content.as_bytes());
    hex::encode(hasher.finalize())
}

// FIN DEL ARCHIVO [apps/controller/src/services/proxy_pipeline.rs]
