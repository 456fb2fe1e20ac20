use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::errors::VaultError;
use super::models::PlayResponse;
use crate::http::{HttpClient, RequestBody, RequestOptions, ResponseBody};

/// Operations offered by the spreadsheet-backed script endpoint
#[async_trait]
pub trait VaultEndpoint: Send + Sync {
    /// Asks the server for a verdict for this player and device
    async fn play(&self, name: &str, device_id: &str) -> Result<PlayResponse, VaultError>;

    /// Removes a player's entry so the name can play again
    async fn delete_player(&self, name: &str, credentials: &str) -> Result<Value, VaultError>;

    /// Total number of plays recorded so far
    async fn play_count(&self) -> Result<u64, VaultError>;
}

/// VaultEndpoint over HTTP with form-encoded actions
pub struct HttpVaultEndpoint {
    http: Arc<HttpClient>,
    url: String,
}

impl HttpVaultEndpoint {
    pub fn new(http: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl VaultEndpoint for HttpVaultEndpoint {
    #[instrument(skip(self))]
    async fn play(&self, name: &str, device_id: &str) -> Result<PlayResponse, VaultError> {
        let body = RequestBody::form([("action", "play"), ("name", name), ("deviceId", device_id)]);
        let response = self.http.post(&self.url, body, RequestOptions::new()).await?;

        let value = expect_json(response)?;
        debug!(response = %value, "Play response received");
        serde_json::from_value(value).map_err(|e| VaultError::UnexpectedResponse(e.to_string()))
    }

    #[instrument(skip(self, credentials))]
    async fn delete_player(&self, name: &str, credentials: &str) -> Result<Value, VaultError> {
        let body = RequestBody::form([
            ("action", "delete"),
            ("name", name),
            ("credentials", credentials),
        ]);
        let response = self.http.post(&self.url, body, RequestOptions::new()).await?;
        Ok(response.into_json())
    }

    #[instrument(skip(self))]
    async fn play_count(&self) -> Result<u64, VaultError> {
        let response = self.http.get(&self.url, RequestOptions::new()).await?;
        let value = expect_json(response)?;

        match value.get("plays") {
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| VaultError::UnexpectedResponse(format!("plays is {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| VaultError::UnexpectedResponse(format!("plays is {s:?}"))),
            _ => Err(VaultError::UnexpectedResponse(format!(
                "missing plays in {value}"
            ))),
        }
    }
}

fn expect_json(response: ResponseBody) -> Result<Value, VaultError> {
    match response {
        ResponseBody::Json(value) => Ok(value),
        ResponseBody::Text(text) => Err(VaultError::UnexpectedResponse(format!(
            "expected JSON, got text: {text}"
        ))),
    }
}
