// Public API - what other modules can use
pub use errors::FlagError;
pub use models::{is_truthy, Flag, FlagMeta, FlagUpdate, OVERWRITE_META_KEY};
pub use store::{FlagStore, DEFAULT_SESSION_KEY};

// Internal modules
mod errors;
mod models;
mod store;
