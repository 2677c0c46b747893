// [libs/domain/models/src/service.rs]
/*!
 * =================================================================
 * APARATO: SERVICE DOMAIN MODEL & CRASH-LOOP FSM (V6.3 - GOLD MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE CONTENEDOR, ESTADO OBSERVADO Y FSM
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. DESIRED VS ACTUAL: El servicio porta simultáneamente la intención
 *    del operador (desired_state) y la observación del Reconciler
 *    (container_id, last_exit_code, health_status).
 * 2. PURE FSM: La máquina de crash-loop es una función pura sobre
 *    (contador, ventana, código de salida, reloj); la persistencia se
 *    limita a aplicar el veredicto.
 * 3. PROBE AUTO-DETECTION: La clase de sonda se deriva del nombre de
 *    imagen sin tocar la red.
 *
 * # Mathematical Proof (Crash-Loop Determinism):
 * Con ventana W y umbral T fijos, la secuencia de veredictos es una
 * función determinista de la secuencia de (exit_code, timestamp); dos
 * reproducciones del mismo rastro producen el mismo estado final.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use typeshare::typeshare;

/// Ventana de observación de reinicios (W).
pub const CRASH_LOOP_WINDOW_MINUTES: i64 = 10;

/// Umbral de reinicios no-cero dentro de la ventana (T).
pub const CRASH_LOOP_THRESHOLD: i64 = 5;

/// Intención del operador sobre el ciclo de vida del contenedor.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    Running,
    Stopped,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredState::Running => "running",
            DesiredState::Stopped => "stopped",
        }
    }

    /// Frontera cerrada: cualquier literal fuera del catálogo es rechazado.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "running" => Some(DesiredState::Running),
            "stopped" => Some(DesiredState::Stopped),
            _ => None,
        }
    }
}

/// Veredicto de la última sonda de salud.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Fail,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Fail => "fail",
            HealthStatus::Unknown => "unknown",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "ok" => Some(HealthStatus::Ok),
            "fail" => Some(HealthStatus::Fail),
            "unknown" => Some(HealthStatus::Unknown),
            _ => None,
        }
    }
}

/// Clase de sonda derivada del nombre de imagen.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Http,
    Postgres,
    Mysql,
    Redis,
}

impl ProbeKind {
    /**
     * Deriva la clase de sonda del nombre de imagen del contenedor.
     *
     * `postgres*` → Postgres, `mysql*`/`mariadb*` → Mysql,
     * `redis*` → Redis, cualquier otra → Http.
     */
    pub fn detect(image_reference: &str) -> Self {
        // El nombre puede venir calificado (registry/org/imagen:tag);
        // la clase se decide sobre el último segmento.
        let bare_image_name = image_reference
            .rsplit('/')
            .next()
            .unwrap_or(image_reference)
            .split(':')
            .next()
            .unwrap_or(image_reference);

        if bare_image_name.starts_with("postgres") {
            ProbeKind::Postgres
        } else if bare_image_name.starts_with("mysql") || bare_image_name.starts_with("mariadb") {
            ProbeKind::Mysql
        } else if bare_image_name.starts_with("redis") {
            ProbeKind::Redis
        } else {
            ProbeKind::Http
        }
    }
}

/// Mapeo de puerto contenedor -> host.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortBinding {
    #[typeshare(serialized_as = "number")]
    pub container: i64,
    #[typeshare(serialized_as = "number")]
    pub host: i64,
}

/// Montaje de volumen host -> contenedor.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeBinding {
    pub host: String,
    pub container: String,
    pub read_only: bool,
}

/// Especificación de contenedor + estado observado por el Reconciler.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    #[typeshare(serialized_as = "number")]
    pub project_id: i64,
    /// Etiqueta DNS única dentro del proyecto.
    pub name: String,
    pub description: Option<String>,
    /// Referencia de imagen obligatoria.
    pub image: String,
    /// Identidad del contenedor vivo, si el Reconciler materializó uno.
    pub container_id: Option<String>,
    /// Mapa llave -> valor de entorno no-secreto ya resuelto.
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortBinding>,
    pub volumes: Vec<VolumeBinding>,
    #[typeshare(serialized_as = "number")]
    pub registry_id: Option<i64>,
    /// Ruta de sonda HTTP; None desactiva la vigilancia de salud.
    pub health_path: Option<String>,
    pub desired_state: DesiredState,
    #[typeshare(serialized_as = "number")]
    pub last_exit_code: Option<i64>,
    #[typeshare(serialized_as = "number")]
    pub restart_count: i64,
    pub restart_window_at: Option<DateTime<Utc>>,
    pub crash_looping: bool,
    pub health_status: HealthStatus,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Veredicto inmutable de un paso de la FSM de crash-loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashLoopVerdict {
    pub restart_count: i64,
    pub restart_window_at: Option<DateTime<Utc>>,
    pub crash_looping: bool,
    /// Estado deseado implicado: Stopped cuando la FSM dispara.
    pub desired_state: DesiredState,
}

/**
 * Ejecuta un paso de la FSM de crash-loop ante una salida observada.
 *
 * Reglas (ventana W, umbral T):
 * 1. Salida cero: el rastro de reinicios no muta.
 * 2. Ventana ausente o vencida: ventana = now, contador = 1.
 * 3. Ventana viva: contador += 1.
 * 4. contador >= T dentro de la ventana con salida no-cero:
 *    crash_looping = true y desired_state = Stopped.
 */
pub fn crash_loop_step(
    current_restart_count: i64,
    current_window_anchor: Option<DateTime<Utc>>,
    current_desired_state: DesiredState,
    observed_exit_code: i64,
    observation_instant: DateTime<Utc>,
) -> CrashLoopVerdict {
    // 1. SALIDA LIMPIA: El rastro permanece intacto.
    if observed_exit_code == 0 {
        return CrashLoopVerdict {
            restart_count: current_restart_count,
            restart_window_at: current_window_anchor,
            crash_looping: false,
            desired_state: current_desired_state,
        };
    }

    // 2. RESOLUCIÓN DE VENTANA: Ancla nueva si no existe o si venció.
    let window_expired = current_window_anchor
        .map(|anchor| observation_instant - anchor > Duration::minutes(CRASH_LOOP_WINDOW_MINUTES))
        .unwrap_or(true);

    let (next_count, next_anchor) = if window_expired {
        (1, observation_instant)
    } else {
        (
            current_restart_count + 1,
            current_window_anchor.expect("live window always carries an anchor"),
        )
    };

    // 3. DISPARO DEL UMBRAL: T reinicios no-cero dentro de la ventana.
    if next_count >= CRASH_LOOP_THRESHOLD {
        return CrashLoopVerdict {
            restart_count: next_count,
            restart_window_at: Some(next_anchor),
            crash_looping: true,
            desired_state: DesiredState::Stopped,
        };
    }

    CrashLoopVerdict {
        restart_count: next_count,
        restart_window_at: Some(next_anchor),
        crash_looping: false,
        desired_state: current_desired_state,
    }
}

/**
 * Veredicto de desbloqueo: única salida legal del estado de crash-loop.
 *
 * Limpia la bandera, restituye desired_state = Running y resetea el
 * contador y la ventana (invariante: contador 0 ⇔ ventana ausente).
 */
pub fn crash_loop_unlock() -> CrashLoopVerdict {
    CrashLoopVerdict {
        restart_count: 0,
        restart_window_at: None,
        crash_looping: false,
        desired_state: DesiredState::Running,
    }
}
