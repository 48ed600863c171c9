//! Application state for the SQL gateway.

use std::sync::Arc;

use common::config::AppConfig;

use crate::dispatcher::Dispatcher;
use crate::registry::ConnectionRegistry;
use crate::service::SqlService;

/// State shared by every session and admin handler.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Creates a new application state with an empty registry.
    pub fn new(config: AppConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let service = SqlService::new(config.clone(), registry.clone());
        Self {
            dispatcher: Dispatcher::new(Arc::new(service)),
            registry,
            config,
        }
    }
}
