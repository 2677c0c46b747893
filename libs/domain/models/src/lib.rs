// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODEL ACCESS MATRIX (V5.0 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: PUNTO ÚNICO DE VERDAD DE ENTIDADES Y CONTRATOS
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. CLOSED ENUMERATIONS: Todos los estados (salud, dominio, certificado)
 *    son enumeraciones cerradas validadas en la frontera del Store.
 * 2. PURE LOGIC STRATA: Las máquinas de estado (crash-loop, dominio) viven
 *    aquí como funciones puras, sin dependencia de persistencia.
 * 3. NOMINAL ACCESS: El barrel file expone únicamente los contratos de
 *    autoridad hacia los estratos L3/L4.
 * =================================================================
 */

// --- ESTRATO 1: TOPOLOGÍA DE DESPLIEGUE ---

/// Proyectos: agrupación de servicios con red privada compartida.
pub mod project;
/// Servicios: especificación de contenedor + estado observado + FSM de crash-loop.
pub mod service;
/// Variables de entorno con invariante XOR de secreto.
pub mod env_var;
/// Rutas externas (dominio[, path]) -> puerto de servicio.
pub mod route;

// --- ESTRATO 2: TLS Y DOMINIOS ---

/// Certificados X.509 con material de llave cifrado en reposo.
pub mod certificate;
/// Dominios y su máquina de estados de verificación de propiedad.
pub mod domain;
/// Snapshots inmutables de configuración del proxy inverso.
pub mod proxy;

// --- ESTRATO 3: ÍNDICE, GOBERNANZA Y TELEMETRÍA ---

/// Proyección de entidades canónicas hacia el índice de búsqueda.
pub mod search;
/// Tokens de API, usuarios y jerarquía RBAC.
pub mod rbac;
/// Entradas de auditoría append-only y muestras métricas históricas.
pub mod telemetry;
/// Entidades de soporte: ajustes, registros, estados OAuth, plantillas.
pub mod support;

// --- ESTRATO 4: FRONTERA DE VALIDACIÓN ---

/// Validadores de frontera: longitudes, etiquetas DNS, puertos.
pub mod validation;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use certificate::{Certificate, CertificateStatus, CertificateType};
pub use domain::{Domain, DomainStatus, DomainVerification, VerificationMethod, VerificationStatus};
pub use env_var::EnvVar;
pub use project::Project;
pub use proxy::ProxyConfigSnapshot;
pub use rbac::{Client, Role, Token, User};
pub use route::Route;
pub use search::{SearchDoc, SearchEntityType};
pub use service::{
    crash_loop_step, crash_loop_unlock, CrashLoopVerdict, DesiredState, HealthStatus,
    PortBinding, ProbeKind, Service, VolumeBinding, CRASH_LOOP_THRESHOLD,
    CRASH_LOOP_WINDOW_MINUTES,
};
pub use telemetry::{AuditEntry, MetricSample};
pub use validation::{ValidationFault, ValidationResult};
pub use support::{EnvTemplate, EnvTemplateVariable, OAuthState, Registry, Setting, WebhookDelivery};
