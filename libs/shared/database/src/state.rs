use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};

use crate::identity::{IdentityProvider, MemoryIdentity, SupabaseIdentity};
use crate::memory::MemoryStore;
use crate::postgrest::SupabaseStore;
use crate::store::DocumentStore;

/// Shared handles every cell router is built over.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self { config, store, identity }
    }

    /// Wires the backend selected in the configuration.
    pub fn from_config(config: AppConfig) -> Self {
        match config.store_backend {
            StoreBackend::Supabase => {
                info!("Using Supabase store at {}", config.supabase_url);
                let store = Arc::new(SupabaseStore::new(&config));
                let identity = Arc::new(SupabaseIdentity::new(&config));
                Self::new(Arc::new(config), store, identity)
            }
            StoreBackend::Memory => {
                info!("Using in-memory store");
                Self::new(Arc::new(config), Arc::new(MemoryStore::new()), Arc::new(MemoryIdentity::new()))
            }
        }
    }
}
