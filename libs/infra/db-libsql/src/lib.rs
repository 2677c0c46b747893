// [libs/infra/db-libsql/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PERSISTENCE ACCESS MATRIX (V6.0 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE SUBSISTEMAS DE PERSISTENCIA
 *
 * # Mathematical Proof (Modular Encapsulation):
 * El barrel file actúa como una interfaz galvánica: los sub-módulos
 * permanecen aislados y solo las estructuras de autoridad (Repositories,
 * DbClient, EventBridge) son expuestas a los estratos superiores.
 * =================================================================
 */

/// Cliente de conexión, pragmas WAL/FK y reintentos acotados.
pub mod client;
/// Catálogo semántico de fallos de persistencia.
pub mod errors;
/// Toolkit de mapeo fila <-> dominio.
pub mod mapping;
/// Motor de migraciones versionadas embebidas.
pub mod migrations;
/// Puente de señales post-commit (índice + proxy).
pub mod signals;

/// Repositorios tipados de autoridad única por entidad.
pub mod repositories;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use client::DbClient;
pub use errors::StoreError;
pub use signals::{EventBridge, IndexJob};
