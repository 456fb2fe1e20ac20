// Cupid's Vault prize wheel
//
// Everything the page script does except touching the DOM: name checks,
// device bookkeeping, the endpoint round trip and the wheel math.

// Public API - what other modules can use
pub use endpoint::{HttpVaultEndpoint, VaultEndpoint};
pub use errors::VaultError;
pub use generators::{DeviceIdGenerator, RandomDeviceIdGenerator};
pub use models::{PlayRecord, PlayResponse, PlayerName, VaultStatus, Verdict};
pub use service::{SpinResult, VaultService, GAME_ACTIVE_FLAG, NAME_ALREADY_PLAYED, SERVER_TESTING_FLAG};
pub use wheel::{spin_message, stop_angles, SpinPhase, SpinPlan, Wheel};

// Internal modules
mod endpoint;
mod errors;
mod generators;
mod models;
mod service;
mod wheel;
