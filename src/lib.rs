// Library crate for the Cupid's Vault client core
// This file exposes the public API for integration tests and the binary

pub mod config;
pub mod event;
pub mod flags;
pub mod http;
pub mod registry;
pub mod shared;
pub mod storage;
pub mod vault;

// Re-export commonly used types for easier access in tests
pub use config::{AppConfig, ConfigError};
pub use event::{EventBus, EventError, ListenerPolicy};
pub use flags::{FlagError, FlagStore};
pub use http::{ApiError, HttpClient, HttpMethod, RequestBody, RequestOptions, ResponseBody};
pub use registry::ModuleRegistry;
pub use shared::{AppContext, AppContextBuilder};
pub use storage::{InMemoryStorage, KeyValueStorage, StorageError};
pub use vault::{HttpVaultEndpoint, VaultEndpoint, VaultError, VaultService, VaultStatus};
