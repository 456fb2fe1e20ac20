use thiserror::Error;

use crate::http::ApiError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Enter a valid first name (letters only)")]
    InvalidFirstName,

    #[error("Enter a single last initial (A-Z)")]
    InvalidLastInitial,

    #[error("The vault is closed")]
    GameClosed,

    #[error("This device already played as {name}")]
    AlreadyPlayed { name: String },

    #[error("Name already played")]
    NameAlreadyPlayed,

    #[error("A play request is already in flight")]
    PlayInProgress,

    #[error("Endpoint reported an error: {0}")]
    Endpoint(String),

    #[error("Unexpected endpoint response: {0}")]
    UnexpectedResponse(String),

    #[error("No verdict to spin for")]
    NoVerdict,

    #[error("The wheel was already spun for this verdict")]
    AlreadySpun,

    #[error("The wheel is still spinning")]
    SpinInProgress,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
