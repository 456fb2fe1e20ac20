use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::HttpMethod;

/// Topic emitted after every successful HTTP request
pub const API_RESPONSE: &str = "api:response";

/// Topic emitted before an HTTP failure is returned to the caller
pub const API_ERROR: &str = "api:error";

/// Payload of [`API_RESPONSE`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponseEvent {
    pub method: HttpMethod,
    pub url: String,
    pub data: Value,
}

/// Payload of [`API_ERROR`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorEvent {
    pub method: HttpMethod,
    pub url: String,
    pub error: String,
    /// Present when the server answered with a non-success status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}
