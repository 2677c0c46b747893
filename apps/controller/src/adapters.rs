// [apps/controller/src/adapters.rs]
/*!
 * =================================================================
 * APARATO: EXTERNAL COLLABORATOR SEAMS (V4.2 - NARROW INTERFACES)
 * CLASIFICACIÓN: APPLICATION BOUNDARY (ESTRATO L4)
 * RESPONSABILIDAD: CONTRATOS HACIA DOCKER, PROXY, ACME, DNS Y RELOJ
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. NARROW SEAMS: El núcleo consume colaboradores a través de traits
 *    estrechos; ninguna implementación concreta vive en el núcleo.
 * 2. CANCELABLE CALLS: Todas las operaciones son futuros; soltar el
 *    futuro aborta el trabajo en vuelo sin escrituras parciales.
 * 3. DETACHED FALLBACK: Los stand-ins Detached* reportan
 *    CollaboratorError en cada llamada; los daemons degradan y el
 *    proceso jamás colapsa por un colaborador ausente.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use helmsman_domain_models::{PortBinding, VolumeBinding};
use helmsman_infra_db::repositories::certificate::IssuedMaterial;
use helmsman_infra_db::StoreError;
use std::collections::BTreeMap;

/// Especificación completa del contenedor entregada al adaptador Docker.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub service_id: i64,
    /// Nombre canónico del contenedor: <red>_<servicio>.
    pub container_name: String,
    pub image: String,
    /// Entorno ya resuelto; los secretos viajan descifrados SOLO en memoria.
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortBinding>,
    pub volumes: Vec<VolumeBinding>,
    /// Red privada del proyecto (proj_<id>).
    pub network: String,
    /// Credenciales de registro descifradas, si el servicio las referencia.
    pub registry_credentials: Option<(String, String)>,
}

/// Salida observada de un contenedor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitEvent {
    pub container_id: String,
    pub exit_code: i64,
}

/// Colaborador del daemon Docker del host.
#[async_trait]
pub trait DockerAdapter: Send + Sync {
    /// Materializa (idempotente) el contenedor y retorna su identidad.
    async fn ensure_container(&self, spec: &ContainerSpec) -> Result<String, StoreError>;
    async fn stop(&self, container_id: &str) -> Result<(), StoreError>;
    /// Flujo perpetuo de salidas observadas (container_id, exit_code).
    fn observe_exits(&self) -> BoxStream<'static, ExitEvent>;
}

/// Colaborador del proxy inverso del host.
#[async_trait]
pub trait ProxyAdapter: Send + Sync {
    async fn validate(&self, config_text: &str) -> Result<(), StoreError>;
    async fn install_and_reload(&self, config_text: &str) -> Result<(), StoreError>;
}

/// Colaborador ACME para emisión y renovación de certificados.
#[async_trait]
pub trait AcmeAdapter: Send + Sync {
    async fn issue(&self, domain: &str) -> Result<IssuedMaterial, StoreError>;
    async fn renew(&self, domain: &str) -> Result<IssuedMaterial, StoreError>;
}

/// Colaborador del proveedor DNS para desafíos TXT.
#[async_trait]
pub trait DnsAdapter: Send + Sync {
    async fn ensure_txt(&self, fqdn: &str, value: &str, ttl_seconds: u32)
        -> Result<(), StoreError>;
    async fn delete_txt(&self, fqdn: &str, value: &str) -> Result<(), StoreError>;
}

/// Reloj inyectable para determinismo en el Proving Grounds.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reloj del sistema (UTC).
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// --- STAND-INS DESCONECTADOS ---
// Permiten la ignición del binario sin colaboradores cableados; cada
// llamada degrada a CollaboratorError y los daemons continúan.

fn detached_fault(collaborator: &str) -> StoreError {
    StoreError::Collaborator(format!("{}_NOT_WIRED", collaborator))
}

pub struct DetachedDocker;

#[async_trait]
impl DockerAdapter for DetachedDocker {
    async fn ensure_container(&self, _spec: &ContainerSpec) -> Result<String, StoreError> {
        Err(detached_fault("DOCKER"))
    }

    async fn stop(&self, _container_id: &str) -> Result<(), StoreError> {
        Err(detached_fault("DOCKER"))
    }

    fn observe_exits(&self) -> BoxStream<'static, ExitEvent> {
        Box::pin(futures::stream::pending())
    }
}

pub struct DetachedProxy;

#[async_trait]
impl ProxyAdapter for DetachedProxy {
    async fn validate(&self, _config_text: &str) -> Result<(), StoreError> {
        Err(detached_fault("PROXY"))
    }

    async fn install_and_reload(&self, _config_text: &str) -> Result<(), StoreError> {
        Err(detached_fault("PROXY"))
    }
}

pub struct DetachedAcme;

#[async_trait]
impl AcmeAdapter for DetachedAcme {
    async fn issue(&self, _domain: &str) -> Result<IssuedMaterial, StoreError> {
        Err(detached_fault("ACME"))
    }

    async fn renew(&self, _domain: &str) -> Result<IssuedMaterial, StoreError> {
        Err(detached_fault("ACME"))
    }
}

pub struct DetachedDns;

#[async_trait]
impl DnsAdapter for DetachedDns {
    async fn ensure_txt(
        &self,
        _fqdn: &str,
        _value: &str,
        _ttl_seconds: u32,
    ) -> Result<(), StoreError> {
        Err(detached_fault("DNS"))
    }

    async fn delete_txt(&self, _fqdn: &str, _value: &str) -> Result<(), StoreError> {
        Err(detached_fault("DNS"))
    }
}
