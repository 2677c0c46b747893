// [apps/controller/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: BACKGROUND SERVICES MATRIX (V4.0 - DAEMON TOPOLOGY)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: CATÁLOGO DE DAEMONS COOPERATIVOS DEL PLANO DE CONTROL
 * =================================================================
 */

/// L1: convergencia contenedores <- estado deseado + observador de salidas.
pub mod reconciler;
/// L2: sondas de salud con autodetección de clase.
pub mod health_sentinel;
/// C5: render determinista, validación y activación de snapshots.
pub mod proxy_pipeline;
/// C6: altas, emisión ACME y barrido de vencimiento.
pub mod cert_manager;
/// C7: desafíos de propiedad de dominios.
pub mod domain_verifier;
/// Cola post-commit del índice y reparación completa.
pub mod index_maintainer;
/// Higiene: métricas, estados OAuth y snapshots fríos.
pub mod retention;
