// [apps/controller/src/state.rs]
/*!
 * =================================================================
 * APARATO: CONTROLLER SHARED STATE (V5.1 - NEXUS SEALED)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L4)
 * RESPONSABILIDAD: ENSAMBLAJE DEL NEXO REPOSITORIOS + ÍNDICE + SEAMS
 *
 * # Mathematical Proof (Single Assembly Point):
 * Todo repositorio comparte el MISMO DbClient y el MISMO EventBridge;
 * las señales post-commit y la serialización de escritores convergen en
 * un único punto de verdad.
 * =================================================================
 */

use crate::adapters::{AcmeAdapter, Clock, DnsAdapter, DockerAdapter, ProxyAdapter};
use helmsman_infra_db::repositories::{
    AuditRepository, CertificateRepository, ClientRepository, DomainRepository,
    EnvTemplateRepository, EnvVarRepository, IntegrationRepository, MetricsRepository,
    OAuthStateRepository, ProjectRepository, RegistryRepository, RouteRepository,
    ServiceRepository, SettingsRepository, SnapshotRepository, TokenRepository,
    UserRepository,
};
use helmsman_infra_db::{DbClient, EventBridge, IndexJob, StoreError};
use helmsman_infra_search::SearchIndex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{instrument, warn};

/// Capacidad de la cola post-commit de trabajos de índice.
const INDEX_QUEUE_CAPACITY: usize = 256;

/// Colaboradores externos inyectados en la ignición.
pub struct Collaborators {
    pub docker: Arc<dyn DockerAdapter>,
    pub proxy: Arc<dyn ProxyAdapter>,
    pub acme: Arc<dyn AcmeAdapter>,
    pub dns: Arc<dyn DnsAdapter>,
    pub clock: Arc<dyn Clock>,
}

/// Nexo de estado compartido entre daemons y mutaciones de API.
pub struct AppState {
    pub db: DbClient,
    pub bridge: EventBridge,

    // --- REPOSITORIOS DE AUTORIDAD ÚNICA ---
    pub projects: ProjectRepository,
    pub services: ServiceRepository,
    pub env_vars: EnvVarRepository,
    pub routes: RouteRepository,
    pub certificates: CertificateRepository,
    pub domains: DomainRepository,
    pub snapshots: SnapshotRepository,
    pub tokens: TokenRepository,
    pub users: UserRepository,
    pub clients: ClientRepository,
    pub audit: AuditRepository,
    pub metrics: MetricsRepository,
    pub settings: SettingsRepository,
    pub registries: RegistryRepository,
    pub oauth_states: OAuthStateRepository,
    pub env_templates: EnvTemplateRepository,
    pub integrations: IntegrationRepository,

    // --- ÍNDICE SECUNDARIO ---
    pub search: SearchIndex,

    // --- COLABORADORES EXTERNOS ---
    pub docker: Arc<dyn DockerAdapter>,
    pub proxy: Arc<dyn ProxyAdapter>,
    pub acme: Arc<dyn AcmeAdapter>,
    pub dns: Arc<dyn DnsAdapter>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /**
     * Ensambla el nexo completo: abre el Ledger (aplicando migraciones),
     * materializa el índice y cablea los repositorios al puente.
     *
     * Retorna el estado y el extremo consumidor de la cola de índice.
     */
    #[instrument(skip(collaborators))]
    pub async fn assemble(
        database_url: &str,
        collaborators: Collaborators,
    ) -> Result<(Arc<Self>, mpsc::Receiver<IndexJob>), StoreError> {
        let database_client = DbClient::connect(database_url).await?;
        let (event_bridge, index_queue_receiver) = EventBridge::channel(INDEX_QUEUE_CAPACITY);

        let search_index = SearchIndex::open(database_client.clone()).await?;

        let state = Arc::new(Self {
            projects: ProjectRepository::new(database_client.clone(), event_bridge.clone()),
            services: ServiceRepository::new(database_client.clone(), event_bridge.clone()),
            env_vars: EnvVarRepository::new(database_client.clone()),
            routes: RouteRepository::new(database_client.clone(), event_bridge.clone()),
            certificates: CertificateRepository::new(database_client.clone(), event_bridge.clone()),
            domains: DomainRepository::new(database_client.clone()),
            snapshots: SnapshotRepository::new(database_client.clone()),
            tokens: TokenRepository::new(database_client.clone()),
            users: UserRepository::new(database_client.clone()),
            clients: ClientRepository::new(database_client.clone()),
            audit: AuditRepository::new(database_client.clone()),
            metrics: MetricsRepository::new(database_client.clone()),
            settings: SettingsRepository::new(database_client.clone()),
            registries: RegistryRepository::new(database_client.clone(), event_bridge.clone()),
            oauth_states: OAuthStateRepository::new(database_client.clone()),
            env_templates: EnvTemplateRepository::new(database_client.clone(), event_bridge.clone()),
            integrations: IntegrationRepository::new(database_client.clone()),
            search: search_index,
            docker: collaborators.docker,
            proxy: collaborators.proxy,
            acme: collaborators.acme,
            dns: collaborators.dns,
            clock: collaborators.clock,
            db: database_client,
            bridge: event_bridge,
        });

        Ok((state, index_queue_receiver))
    }

    /**
     * Sella evidencia de auditoría sin propagar fallos del rastro:
     * la capa canónica nunca depende de la capa de evidencia.
     */
    pub async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        target_type: &str,
        target_id: &str,
        meta: serde_json::Value,
    ) {
        if let Err(audit_fault) = self
            .audit
            .record(actor, action, target_type, target_id, meta)
            .await
        {
            warn!("📝 [AUDIT_DEGRADED]: Evidence sealing failed: {}", audit_fault);
        }
    }
}
