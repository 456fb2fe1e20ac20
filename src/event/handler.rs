use serde_json::Value;
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// Errors that can occur when emitting events
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Listener rejected event: {0}")]
    Rejected(String),

    #[error("Failed to serialize event payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventError {
    /// Create a rejection error from inside a listener
    pub fn rejected(msg: impl Into<String>) -> Self {
        EventError::Rejected(msg.into())
    }
}

/// A callback registered on a topic
///
/// Listeners run synchronously on the emitting thread, in registration order.
/// Returning an error is how a listener reports failure to the bus.
pub type Listener = Arc<dyn Fn(&Value) -> Result<(), EventError> + Send + Sync>;

/// What the bus does when a listener fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ListenerPolicy {
    /// Stop at the first failing listener and return its error
    #[default]
    Abort,
    /// Log the failure and keep invoking the remaining listeners
    Isolate,
}
