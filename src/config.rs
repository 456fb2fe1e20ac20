use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::event::ListenerPolicy;
use crate::flags::DEFAULT_SESSION_KEY;

pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:8080/exec";
pub const DEFAULT_PLAY_RECORD_KEY: &str = "swag-cv-play";
pub const DEFAULT_DEVICE_ID_KEY: &str = "swag-cv-device_id";
pub const DEFAULT_LEGACY_DEVICE_ID_KEY: &str = "swag-ff-device_id";

pub const ENV_ENDPOINT_URL: &str = "VAULT_ENDPOINT_URL";
pub const ENV_GAME_ACTIVE: &str = "VAULT_GAME_ACTIVE";
pub const ENV_LISTENER_POLICY: &str = "VAULT_LISTENER_POLICY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be true or false, got {value:?}")]
    InvalidBool { key: String, value: String },

    #[error("{key} must be abort or isolate, got {value:?}")]
    InvalidPolicy { key: String, value: String },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Session storage key of the persisted flag snapshot
    pub flag_session_key: String,
    /// Spreadsheet-backed script endpoint the vault talks to
    pub endpoint_url: String,
    /// Headers sent with every HTTP request
    pub default_headers: BTreeMap<String, String>,
    pub listener_policy: ListenerPolicy,
    /// Default for the `vault.game_active` flag
    pub game_active: bool,
    pub play_record_key: String,
    pub device_id_key: String,
    /// Older device id slot, read when the current one is empty
    pub legacy_device_id_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            flag_session_key: DEFAULT_SESSION_KEY.to_string(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            default_headers: BTreeMap::new(),
            listener_policy: ListenerPolicy::default(),
            game_active: true,
            play_record_key: DEFAULT_PLAY_RECORD_KEY.to_string(),
            device_id_key: DEFAULT_DEVICE_ID_KEY.to_string(),
            legacy_device_id_key: DEFAULT_LEGACY_DEVICE_ID_KEY.to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with values from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_ENDPOINT_URL) {
            config.endpoint_url = url;
        }

        if let Some(value) = lookup(ENV_GAME_ACTIVE) {
            config.game_active = parse_bool(ENV_GAME_ACTIVE, &value)?;
        }

        if let Some(value) = lookup(ENV_LISTENER_POLICY) {
            let normalized = value.trim().to_ascii_lowercase();
            config.listener_policy =
                ListenerPolicy::from_str(&normalized).map_err(|_| ConfigError::InvalidPolicy {
                    key: ENV_LISTENER_POLICY.to_string(),
                    value,
                })?;
        }

        debug!(
            endpoint_url = %config.endpoint_url,
            game_active = config.game_active,
            listener_policy = %config.listener_policy,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = url.into();
        self
    }

    pub fn with_listener_policy(mut self, policy: ListenerPolicy) -> Self {
        self.listener_policy = policy;
        self
    }

    pub fn with_game_active(mut self, active: bool) -> Self {
        self.game_active = active;
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
