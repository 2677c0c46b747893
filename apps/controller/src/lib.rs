// [apps/controller/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CONTROLLER LIBRARY ROOT (V4.0 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DEL PLANO DE CONTROL
 * =================================================================
 */

/// Contratos hacia colaboradores externos (Docker, proxy, ACME, DNS, reloj).
pub mod adapters;
/// Secuenciador de ignición y cierre cooperativo.
pub mod kernel;
/// Daemons de fondo del plano de control.
pub mod services;
/// Nexo de estado compartido (repositorios + índice + seams).
pub mod state;

/// Preludio nominal para los binarios del plano de control.
pub mod prelude {
    pub use crate::adapters::{
        AcmeAdapter, Clock, ContainerSpec, DetachedAcme, DetachedDns, DetachedDocker,
        DetachedProxy, DnsAdapter, DockerAdapter, ExitEvent, ProxyAdapter, SystemClock,
    };
    pub use crate::kernel::{ControllerKernel, KernelConfig};
    pub use crate::state::{AppState, Collaborators};
}
