use std::sync::Arc;

use cupids_vault::{
    event::{API_ERROR, API_RESPONSE},
    AppConfig, AppContext, AppContextBuilder, HttpVaultEndpoint, InMemoryStorage, VaultService,
};

use super::mocks::EventRecorder;
use super::server::StubServer;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub server: StubServer,
    pub context: AppContext,
    pub recorder: EventRecorder,
    /// Persistent device storage, shared across simulated reloads
    pub local_storage: Arc<InMemoryStorage>,
    pub session_storage: Arc<InMemoryStorage>,
}

impl TestSetup {
    /// A vault wired to the stub endpoint through the context's HTTP client
    pub fn vault(&self) -> VaultService {
        let endpoint = Arc::new(HttpVaultEndpoint::new(
            self.context.http.clone(),
            self.server.exec_url(),
        ));
        VaultService::new(&self.context, endpoint, self.local_storage.clone()).unwrap()
    }

    /// A fresh context over the same storages, as after a page reload
    pub fn reload(&self) -> AppContext {
        AppContextBuilder::new()
            .with_config(self.context.config.clone())
            .with_session_storage(self.session_storage.clone())
            .build()
    }
}

pub struct TestSetupBuilder {
    winners: Vec<&'static str>,
    config: AppConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            winners: vec![],
            config: AppConfig::default(),
        }
    }

    pub fn with_winners(mut self, winners: Vec<&'static str>) -> Self {
        self.winners = winners;
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(self) -> TestSetup {
        let server = StubServer::start_with_winners(&self.winners).await;
        let session_storage = Arc::new(InMemoryStorage::new());
        let local_storage = Arc::new(InMemoryStorage::new());

        let context = AppContextBuilder::new()
            .with_config(self.config.with_endpoint_url(server.exec_url()))
            .with_session_storage(session_storage.clone())
            .build();

        let recorder = EventRecorder::new();
        recorder.attach(&context.events, API_RESPONSE);
        recorder.attach(&context.events, API_ERROR);

        TestSetup {
            server,
            context,
            recorder,
            local_storage,
            session_storage,
        }
    }
}
