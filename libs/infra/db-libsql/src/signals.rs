// [libs/infra/db-libsql/src/signals.rs]
/*!
 * =================================================================
 * APARATO: POST-COMMIT EVENT BRIDGE (V2.3 - BOUNDED QUEUE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: SEÑALIZACIÓN POST-COMMIT HACIA ÍNDICE Y PROXY
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. POST-COMMIT ONLY: Las señales se disparan tras el commit exitoso;
 *    la capa canónica jamás depende de fallos de capas secundarias.
 * 2. BOUNDED DEGRADATION: Cola acotada fire-and-forget; el desborde
 *    marca una bandera de reindexación completa en lugar de bloquear.
 * 3. DIRTY FLAG: Las mutaciones de rutas/certificados encienden la
 *    bandera del pipeline de proxy; el daemon la drena atómicamente.
 * =================================================================
 */

use helmsman_domain_models::SearchEntityType;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Trabajo incremental de mantenimiento del índice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexJob {
    Upsert {
        entity_type: SearchEntityType,
        entity_id: i64,
    },
    Delete {
        entity_type: SearchEntityType,
        entity_id: i64,
    },
}

/// Puente de señales post-commit compartido entre repositorios y daemons.
#[derive(Clone)]
pub struct EventBridge {
    index_queue: mpsc::Sender<IndexJob>,
    proxy_dirty: Arc<AtomicBool>,
    reindex_requested: Arc<AtomicBool>,
}

impl EventBridge {
    /// Construye el puente junto al extremo consumidor de la cola.
    pub fn channel(queue_capacity: usize) -> (Self, mpsc::Receiver<IndexJob>) {
        let (queue_sender, queue_receiver) = mpsc::channel(queue_capacity);
        (
            Self {
                index_queue: queue_sender,
                proxy_dirty: Arc::new(AtomicBool::new(false)),
                reindex_requested: Arc::new(AtomicBool::new(false)),
            },
            queue_receiver,
        )
    }

    /// Puente sin consumidor vivo: todo encolado degrada a reindex-requested.
    /// Utilizado por el Proving Grounds y los binarios de mantenimiento.
    pub fn disconnected() -> Self {
        let (bridge, abandoned_receiver) = Self::channel(1);
        drop(abandoned_receiver);
        bridge
    }

    /**
     * Encola un trabajo incremental de índice (fire-and-forget).
     *
     * El desborde de la cola no bloquea ni falla: enciende la bandera de
     * reindexación completa y el mantenimiento periódico repara el índice.
     */
    pub fn schedule_index(&self, job: IndexJob) {
        if let Err(rejected) = self.index_queue.try_send(job) {
            debug!("📮 [BRIDGE_OVERFLOW]: Index queue saturated ({:?}); full reindex requested.", rejected);
            self.reindex_requested.store(true, Ordering::SeqCst);
        }
    }

    /// Solicita explícitamente una reindexación completa.
    pub fn request_reindex(&self) {
        self.reindex_requested.store(true, Ordering::SeqCst);
    }

    /// Enciende la bandera del pipeline de proxy (mutación de ruta/cert).
    pub fn mark_proxy_dirty(&self) {
        self.proxy_dirty.store(true, Ordering::SeqCst);
    }

    /// Drena atómicamente la bandera del proxy.
    pub fn take_proxy_dirty(&self) -> bool {
        self.proxy_dirty.swap(false, Ordering::SeqCst)
    }

    /// Drena atómicamente la solicitud de reindexación completa.
    pub fn take_reindex_request(&self) -> bool {
        self.reindex_requested.swap(false, Ordering::SeqCst)
    }
}
