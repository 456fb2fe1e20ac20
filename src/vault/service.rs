use rand::Rng;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use super::endpoint::VaultEndpoint;
use super::errors::VaultError;
use super::generators::{DeviceIdGenerator, RandomDeviceIdGenerator};
use super::models::{PlayRecord, PlayerName, VaultStatus, Verdict};
use super::wheel::{SpinPlan, Wheel};
use crate::flags::{FlagMeta, FlagStore};
use crate::shared::AppContext;
use crate::storage::KeyValueStorage;

/// Flag gating the whole promotion
pub const GAME_ACTIVE_FLAG: &str = "vault.game_active";

/// Flag that wipes the device's play record on startup
pub const SERVER_TESTING_FLAG: &str = "vault.server_testing";

/// Error marker the endpoint returns for a name that has already played
pub const NAME_ALREADY_PLAYED: &str = "name_already_played";

/// Persistent storage slots used by the vault
#[derive(Debug, Clone)]
struct VaultKeys {
    play_record: String,
    device_id: String,
    legacy_device_id: String,
}

#[derive(Debug, Default)]
struct GameState {
    verdict: Option<PlayRecord>,
    has_spun: bool,
    play_in_flight: bool,
    wheel: Wheel,
}

/// Result shown once the wheel settles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinResult {
    pub verdict: Verdict,
    pub message: Option<&'static str>,
    pub claim_code: Option<String>,
}

/// Orchestrates a play: validation, the server verdict, persistence and the spin
pub struct VaultService {
    endpoint: Arc<dyn VaultEndpoint>,
    local_storage: Arc<dyn KeyValueStorage>,
    flags: Arc<FlagStore>,
    device_ids: Arc<dyn DeviceIdGenerator>,
    keys: VaultKeys,
    state: Mutex<GameState>,
}

impl VaultService {
    /// Creates the service and registers its flags on the context's store
    ///
    /// With server testing enabled the stored play record is wiped so the
    /// device can play again.
    pub fn new(
        context: &AppContext,
        endpoint: Arc<dyn VaultEndpoint>,
        local_storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self, VaultError> {
        let config = &context.config;

        context.flags.define_once_with_meta(
            GAME_ACTIVE_FLAG,
            config.game_active,
            doc_meta("Whether the vault accepts plays"),
        );
        context.flags.define_once_with_meta(
            SERVER_TESTING_FLAG,
            false,
            doc_meta("Clear this device's play record on startup"),
        );

        let service = Self {
            endpoint,
            local_storage,
            flags: context.flags.clone(),
            device_ids: Arc::new(RandomDeviceIdGenerator::new()),
            keys: VaultKeys {
                play_record: config.play_record_key.clone(),
                device_id: config.device_id_key.clone(),
                legacy_device_id: config.legacy_device_id_key.clone(),
            },
            state: Mutex::new(GameState::default()),
        };

        if service.flags.is(SERVER_TESTING_FLAG) {
            info!("Server testing enabled, clearing stored play record");
            service.local_storage.clear(&service.keys.play_record)?;
        }

        Ok(service)
    }

    pub fn with_device_id_generator(mut self, generator: Arc<dyn DeviceIdGenerator>) -> Self {
        self.device_ids = generator;
        self
    }

    /// What a visitor should see when the page loads
    #[instrument(skip(self))]
    pub fn status(&self) -> VaultStatus {
        if !self.flags.is(GAME_ACTIVE_FLAG) {
            debug!("Vault is closed");
            return VaultStatus::Closed;
        }

        match self.previous_play() {
            Some(record) => VaultStatus::AlreadyPlayed(record),
            None => VaultStatus::Ready,
        }
    }

    /// The stored play record, if this device has played
    ///
    /// Unreadable or malformed records are treated as absent.
    pub fn previous_play(&self) -> Option<PlayRecord> {
        let raw = match self.local_storage.read(&self.keys.play_record) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Play record unreadable");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Play record malformed, ignoring");
                None
            }
        }
    }

    /// This device's identifier, generated and stored on first use
    pub fn device_id(&self) -> Result<String, VaultError> {
        if let Some(id) = self.local_storage.read(&self.keys.device_id)? {
            return Ok(id);
        }
        if let Some(id) = self.local_storage.read(&self.keys.legacy_device_id)? {
            debug!(device_id = %id, "Using legacy device id");
            return Ok(id);
        }

        let id = self.device_ids.generate();
        self.local_storage.write(&self.keys.device_id, &id)?;
        info!(device_id = %id, "Generated device id");
        Ok(id)
    }

    /// Requests a verdict for a player and stores it on the device
    #[instrument(skip(self))]
    pub async fn play(&self, first_name: &str, last_initial: &str) -> Result<PlayRecord, VaultError> {
        if !self.flags.is(GAME_ACTIVE_FLAG) {
            return Err(VaultError::GameClosed);
        }

        let name = PlayerName::parse(first_name, last_initial)?;
        if let Some(record) = self.previous_play() {
            return Err(VaultError::AlreadyPlayed { name: record.name });
        }

        let _in_flight = InFlightGuard::acquire(&self.state)?;
        let device_id = self.device_id()?;

        info!(player = %name, device_id = %device_id, "Requesting verdict");
        let response = self.endpoint.play(&name.to_string(), &device_id).await?;

        match response.error.as_deref() {
            Some(NAME_ALREADY_PLAYED) => {
                warn!(player = %name, "Name already played");
                return Err(VaultError::NameAlreadyPlayed);
            }
            Some(other) => return Err(VaultError::Endpoint(other.to_string())),
            None => {}
        }

        let record = PlayRecord::new(&response, &name, &device_id);
        let serialized = serde_json::to_string(&record)?;
        self.local_storage.write(&self.keys.play_record, &serialized)?;

        info!(player = %name, verdict = %record.result, "Verdict stored");

        let mut state = self.lock();
        state.verdict = Some(record.clone());
        state.has_spun = false;
        Ok(record)
    }

    /// Plans the single spin allowed for the current verdict
    pub fn spin<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SpinPlan, VaultError> {
        let mut state = self.lock();
        let verdict = state.verdict.as_ref().ok_or(VaultError::NoVerdict)?.result;

        if state.wheel.is_spinning() {
            return Err(VaultError::SpinInProgress);
        }
        if state.has_spun {
            return Err(VaultError::AlreadySpun);
        }

        let plan = state
            .wheel
            .plan_spin(verdict, rng)
            .ok_or(VaultError::SpinInProgress)?;
        state.has_spun = true;

        debug!(
            verdict = %verdict,
            target_angle = plan.target_angle,
            final_rotation = plan.final_rotation,
            "Spin planned"
        );
        Ok(plan)
    }

    /// Lands the wheel and reports the outcome
    pub fn settle(&self, plan: &SpinPlan) -> SpinResult {
        let mut state = self.lock();
        state.wheel.settle(plan);

        let claim_code = state
            .verdict
            .as_ref()
            .filter(|record| record.result.is_win())
            .and_then(|record| record.claim_code.clone());

        SpinResult {
            verdict: plan.verdict,
            message: plan.message(),
            claim_code,
        }
    }

    /// Asks the endpoint how many plays have been recorded
    pub async fn play_count(&self) -> Result<u64, VaultError> {
        self.endpoint.play_count().await
    }

    /// Removes a player on the endpoint so the name can play again
    pub async fn delete_player(&self, name: &str, credentials: &str) -> Result<serde_json::Value, VaultError> {
        self.endpoint.delete_player(name, credentials).await
    }

    fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a play request as in flight until dropped
struct InFlightGuard<'a> {
    state: &'a Mutex<GameState>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(state: &'a Mutex<GameState>) -> Result<Self, VaultError> {
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.play_in_flight {
            return Err(VaultError::PlayInProgress);
        }
        guard.play_in_flight = true;
        Ok(Self { state })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .play_in_flight = false;
    }
}

fn doc_meta(doc: &str) -> FlagMeta {
    let mut meta = FlagMeta::new();
    meta.insert("doc".to_string(), json!(doc));
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::shared::AppContextBuilder;
    use crate::storage::InMemoryStorage;
    use crate::vault::generators::test_utils::FixedDeviceIdGenerator;
    use crate::vault::models::PlayResponse;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Endpoint that answers every play with the same response
    struct ScriptedEndpoint {
        response: PlayResponse,
        calls: AtomicU32,
    }

    impl ScriptedEndpoint {
        fn new(response: PlayResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: AtomicU32::new(0),
            })
        }

        fn win(code: &str) -> Arc<Self> {
            Self::new(PlayResponse {
                result: Some(Verdict::Win),
                claim_code: Some(code.to_string()),
                error: None,
            })
        }
    }

    #[async_trait]
    impl VaultEndpoint for ScriptedEndpoint {
        async fn play(&self, _name: &str, _device_id: &str) -> Result<PlayResponse, VaultError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.response.clone())
        }
        async fn delete_player(&self, _name: &str, _credentials: &str) -> Result<Value, VaultError> {
            Ok(json!({"deleted": true}))
        }
        async fn play_count(&self) -> Result<u64, VaultError> {
            Ok(self.calls.load(Ordering::Relaxed) as u64)
        }
    }

    fn service_with(
        config: AppConfig,
        endpoint: Arc<ScriptedEndpoint>,
        local: Arc<InMemoryStorage>,
    ) -> VaultService {
        let context = AppContextBuilder::new().with_config(config).build();
        VaultService::new(&context, endpoint, local)
            .unwrap()
            .with_device_id_generator(Arc::new(FixedDeviceIdGenerator("dev-fixed000")))
    }

    #[tokio::test]
    async fn test_play_stores_record_and_device_id() {
        let local = Arc::new(InMemoryStorage::new());
        let service = service_with(AppConfig::default(), ScriptedEndpoint::win("CV-42"), local.clone());

        assert_eq!(service.status(), VaultStatus::Ready);
        let record = service.play("jesse", "x").await.unwrap();

        assert_eq!(record.name, "Jesse X");
        assert_eq!(record.claim_code.as_deref(), Some("CV-42"));
        assert_eq!(record.device_id, "dev-fixed000");
        assert_eq!(
            local.read("swag-cv-device_id").unwrap().as_deref(),
            Some("dev-fixed000")
        );
        assert_eq!(service.status(), VaultStatus::AlreadyPlayed(record));
    }

    #[tokio::test]
    async fn test_second_play_is_refused_without_calling_endpoint() {
        let endpoint = ScriptedEndpoint::win("CV-42");
        let service = service_with(
            AppConfig::default(),
            endpoint.clone(),
            Arc::new(InMemoryStorage::new()),
        );

        service.play("jesse", "x").await.unwrap();
        let second = service.play("mary", "k").await;

        assert!(matches!(second, Err(VaultError::AlreadyPlayed { name }) if name == "Jesse X"));
        assert_eq!(endpoint.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected_before_request() {
        let endpoint = ScriptedEndpoint::win("CV-42");
        let service = service_with(
            AppConfig::default(),
            endpoint.clone(),
            Arc::new(InMemoryStorage::new()),
        );

        let result = service.play("j3sse", "x").await;

        assert!(matches!(result, Err(VaultError::InvalidFirstName)));
        assert_eq!(endpoint.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_name_already_played_is_surfaced() {
        let local = Arc::new(InMemoryStorage::new());
        let endpoint = ScriptedEndpoint::new(PlayResponse {
            error: Some(NAME_ALREADY_PLAYED.to_string()),
            ..PlayResponse::default()
        });
        let service = service_with(AppConfig::default(), endpoint, local.clone());

        let result = service.play("jesse", "x").await;

        assert!(matches!(result, Err(VaultError::NameAlreadyPlayed)));
        assert!(!local.contains_key("swag-cv-play"));
        // The in-flight marker is released on error
        assert!(matches!(
            service.play("jesse", "x").await,
            Err(VaultError::NameAlreadyPlayed)
        ));
    }

    #[tokio::test]
    async fn test_closed_vault_refuses_play() {
        let service = service_with(
            AppConfig::default().with_game_active(false),
            ScriptedEndpoint::win("CV-42"),
            Arc::new(InMemoryStorage::new()),
        );

        assert_eq!(service.status(), VaultStatus::Closed);
        assert!(matches!(
            service.play("jesse", "x").await,
            Err(VaultError::GameClosed)
        ));
    }

    #[test]
    fn test_legacy_device_id_is_reused() {
        let local = Arc::new(InMemoryStorage::with_entries([("swag-ff-device_id", "dev-legacy01")]));
        let service = service_with(AppConfig::default(), ScriptedEndpoint::win("x"), local.clone());

        assert_eq!(service.device_id().unwrap(), "dev-legacy01");
        assert!(!local.contains_key("swag-cv-device_id"));
    }

    #[test]
    fn test_malformed_record_reads_as_absent() {
        let local = Arc::new(InMemoryStorage::with_entries([("swag-cv-play", "{oops")]));
        let service = service_with(AppConfig::default(), ScriptedEndpoint::win("x"), local);

        assert!(service.previous_play().is_none());
        assert_eq!(service.status(), VaultStatus::Ready);
    }

    #[test]
    fn test_server_testing_clears_record_on_startup() {
        let local = Arc::new(InMemoryStorage::with_entries([(
            "swag-cv-play",
            r#"{"result":"lose","name":"Jesse X","deviceId":"dev-1"}"#,
        )]));
        let context = AppContextBuilder::new().build();
        context.flags.define(SERVER_TESTING_FLAG, true);

        let service = VaultService::new(&context, ScriptedEndpoint::win("x"), local.clone()).unwrap();

        assert!(!local.contains_key("swag-cv-play"));
        assert_eq!(service.status(), VaultStatus::Ready);
    }

    #[tokio::test]
    async fn test_spin_once_per_verdict() {
        let service = service_with(
            AppConfig::default(),
            ScriptedEndpoint::win("CV-42"),
            Arc::new(InMemoryStorage::new()),
        );
        let mut rng = StdRng::seed_from_u64(3);

        assert!(matches!(service.spin(&mut rng), Err(VaultError::NoVerdict)));

        service.play("jesse", "x").await.unwrap();
        let plan = service.spin(&mut rng).unwrap();
        assert!(matches!(service.spin(&mut rng), Err(VaultError::SpinInProgress)));

        let result = service.settle(&plan);
        assert_eq!(result.verdict, Verdict::Win);
        assert_eq!(result.claim_code.as_deref(), Some("CV-42"));
        assert!(result.message.is_some());

        assert!(matches!(service.spin(&mut rng), Err(VaultError::AlreadySpun)));
    }
}
