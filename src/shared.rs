use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::event::EventBus;
use crate::flags::FlagStore;
use crate::http::HttpClient;
use crate::registry::ModuleRegistry;
use crate::storage::{InMemoryStorage, KeyValueStorage};

/// Registry name of the HTTP client
pub const HTTP_MODULE: &str = "http";

/// Registry name of the flag store
pub const FLAGS_MODULE: &str = "flags";

/// Shared application context containing all core components
///
/// Constructed once per page session and handed to consumers. Cloning is
/// cheap; clones share every component.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub events: EventBus,
    pub modules: ModuleRegistry,
    pub flags: Arc<FlagStore>,
    pub http: Arc<HttpClient>,
}

impl AppContext {
    /// Wires the core components from configuration and a session storage
    pub fn new(config: AppConfig, session_storage: Arc<dyn KeyValueStorage>) -> Self {
        let events = EventBus::with_policy(config.listener_policy);
        let modules = ModuleRegistry::new();

        let flags = Arc::new(FlagStore::new(
            session_storage,
            config.flag_session_key.clone(),
        ));
        let http = Arc::new(
            HttpClient::new(events.clone()).with_default_headers(config.default_headers.clone()),
        );

        modules.register(FLAGS_MODULE, flags.clone());
        modules.register(HTTP_MODULE, http.clone());

        info!(
            listener_policy = %config.listener_policy,
            modules = ?modules.names(),
            "Application context initialized"
        );

        Self {
            config,
            events,
            modules,
            flags,
            http,
        }
    }

    /// Releases listeners and registry entries
    ///
    /// Components still held elsewhere keep working but are no longer
    /// reachable through this context.
    pub fn teardown(self) {
        self.events.clear();
        self.modules.clear();
        debug!("Application context torn down");
    }
}

/// Builder for creating AppContext with overrides
#[derive(Default)]
pub struct AppContextBuilder {
    config: Option<AppConfig>,
    session_storage: Option<Arc<dyn KeyValueStorage>>,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_session_storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.session_storage = Some(storage);
        self
    }

    pub fn build(self) -> AppContext {
        AppContext::new(
            self.config.unwrap_or_default(),
            self.session_storage
                .unwrap_or_else(|| Arc::new(InMemoryStorage::new())),
        )
    }
}
