use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised while persisting the flag session
#[derive(Debug, Error)]
pub enum FlagError {
    #[error("Failed to persist flag session: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to serialize flag session: {0}")]
    Serialization(#[from] serde_json::Error),
}
