use thiserror::Error;

use super::types::ResponseBody;
use crate::event::EventError;

/// Errors returned by [`HttpClient`](super::HttpClient)
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error: {status} {status_text}")]
    Status {
        status: u16,
        status_text: String,
        body: ResponseBody,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header: {name}")]
    InvalidHeader { name: String },

    #[error("Response listener failed: {0}")]
    Listener(#[from] EventError),
}

impl ApiError {
    /// HTTP status code, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidHeader { .. } | ApiError::Listener(_) => None,
        }
    }
}
