//! Shared application state for all routes. Immutable after startup.

use crate::auth::TokenManager;
use crate::config::{ResourceRegistry, Settings};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub settings: Arc<Settings>,
    pub registry: Arc<ResourceRegistry>,
    pub tokens: TokenManager,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, settings: Settings, registry: ResourceRegistry) -> Self {
        let tokens = TokenManager::new(&settings.jwt_secret, settings.token_ttl);
        AppState {
            store,
            settings: Arc::new(settings),
            registry: Arc::new(registry),
            tokens,
        }
    }
}
