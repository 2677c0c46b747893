// [libs/infra/db-libsql/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (V6.2 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS DE AUTORIDAD ÚNICA
 * =================================================================
 */

// --- ESTRATO 1: TOPOLOGÍA DE DESPLIEGUE ---

/// Proyectos y derivación de red privada.
pub mod project;
/// Servicios, enlaces y persistencia de la FSM de crash-loop.
pub mod service;
/// Variables de entorno con invariante XOR y lotes transaccionales.
pub mod env_var;

// --- ESTRATO 2: EXPOSICIÓN EXTERNA Y TLS ---

/// Rutas (dominio[, path] -> puerto) y entradas del render de proxy.
pub mod route;
/// Certificados X.509 con llave cifrada en reposo.
pub mod certificate;
/// Dominios, tentativas y máquina de verificación.
pub mod domain;
/// Snapshots inmutables de configuración del proxy.
pub mod snapshot;

// --- ESTRATO 3: GOBERNANZA, AUDITORÍA Y SOPORTE ---

/// Tokens de API (hash PBKDF2) y usuarios del dashboard.
pub mod identity;
/// Rastro de auditoría append-only.
pub mod audit;
/// Muestras métricas históricas con retención.
pub mod metrics;
/// Ajustes opacos, registros de imágenes y estados OAuth.
pub mod settings;
/// Plantillas de entorno reutilizables.
pub mod env_template;
/// Integraciones GitHub y entregas de webhooks.
pub mod integrations;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use audit::AuditRepository;
pub use certificate::CertificateRepository;
pub use domain::DomainRepository;
pub use env_template::EnvTemplateRepository;
pub use env_var::{EnvVarInput, EnvVarRepository};
pub use identity::{ClientRepository, TokenRepository, UserRepository};
pub use integrations::IntegrationRepository;
pub use metrics::MetricsRepository;
pub use project::ProjectRepository;
pub use route::{RenderInput, RouteRepository};
pub use service::{ServiceRepository, ServiceSpec};
pub use settings::{OAuthStateRepository, RegistryRepository, SettingsRepository};
pub use snapshot::SnapshotRepository;
