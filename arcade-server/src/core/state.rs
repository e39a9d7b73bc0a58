//! Server state
//!
//! ServerState holds shared references to every service. Arc makes the
//! clone handed to each request handler cheap.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::allocation::PaymentAllocator;
use crate::core::Config;
use crate::notify::LogNotifier;
use crate::reconcile::{GatewayClient, Reconciler, TinyPesaClient};
use crate::sessions::SessionService;
use crate::store::MemoryStore;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<dyn GatewayClient>,
    pub allocator: PaymentAllocator,
    pub sessions: SessionService,
    pub reconciler: Reconciler,
    /// Cancelled on shutdown; child tokens gate reconciliation tasks
    pub shutdown: CancellationToken,
}

impl ServerState {
    pub async fn initialize(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway: Arc<dyn GatewayClient> = Arc::new(TinyPesaClient::new(
            config.gateway_base_url.clone(),
            config.gateway_api_key.clone(),
        ));
        Self::with_collaborators(config, store, gateway)
    }

    /// Wire the services over explicit collaborators (test seam)
    pub fn with_collaborators(
        config: &Config,
        store: Arc<MemoryStore>,
        gateway: Arc<dyn GatewayClient>,
    ) -> Self {
        let allocator = PaymentAllocator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(LogNotifier),
        );
        let sessions = SessionService::new(store.clone(), store.clone());
        let reconciler = Reconciler::new(
            gateway.clone(),
            allocator.clone(),
            config.reconcile_config(),
        );

        Self {
            config: config.clone(),
            store,
            gateway,
            allocator,
            sessions,
            reconciler,
            shutdown: CancellationToken::new(),
        }
    }
}
