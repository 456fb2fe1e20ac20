use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use super::errors::ApiError;
use super::types::{HttpMethod, RequestBody, RequestOptions, ResponseBody};
use crate::event::{ApiErrorEvent, ApiResponseEvent, EventBus, API_ERROR, API_RESPONSE};

/// Thin request wrapper that reports every outcome on the event bus
///
/// Responses declared as JSON are parsed, anything else is returned as text.
/// Non-success statuses and transport failures are emitted on `api:error`
/// and then returned to the caller. There are no retries and no timeouts.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    events: EventBus,
    default_headers: BTreeMap<String, String>,
}

impl HttpClient {
    pub fn new(events: EventBus) -> Self {
        Self::with_client(reqwest::Client::new(), events)
    }

    /// Creates a client around an existing reqwest client
    pub fn with_client(client: reqwest::Client, events: EventBus) -> Self {
        Self {
            client,
            events,
            default_headers: BTreeMap::new(),
        }
    }

    /// Sets headers sent with every request unless overridden per request
    pub fn with_default_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Get, url, None, options).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Post, url, Some(body), options).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Put, url, Some(body), options).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Delete, url, None, options).await
    }

    /// Issues a request and broadcasts its outcome
    ///
    /// `api:response` is emitted on success. On failure `api:error` is emitted
    /// exactly once before the error is returned.
    #[instrument(skip(self, body, options))]
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        let result = match self.send(method, url, body, options).await {
            Ok(body) => self.announce_response(method, url, body),
            Err(error) => Err(error),
        };

        if let Err(error) = &result {
            self.announce_error(method, url, error);
        }
        result
    }

    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        let headers = self.merge_headers(&options.headers)?;

        let mut builder = self.client.request(method.into(), url).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        builder = match body {
            Some(RequestBody::Form(pairs)) => builder.form(&pairs),
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Text(text)) => builder.body(text),
            None => builder,
        };

        debug!(url = %url, "Sending request");
        let response = builder.send().await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = if content_type.contains("application/json") {
            ResponseBody::Json(response.json::<Value>().await?)
        } else {
            ResponseBody::Text(response.text().await?)
        };

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        debug!(url = %url, status = status.as_u16(), "Request succeeded");
        Ok(body)
    }

    fn merge_headers(&self, overrides: &BTreeMap<String, String>) -> Result<HeaderMap, ApiError> {
        let mut merged = self.default_headers.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut headers = HeaderMap::with_capacity(merged.len());
        for (name, value) in merged {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| ApiError::InvalidHeader { name: name.clone() })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }

    fn announce_response(
        &self,
        method: HttpMethod,
        url: &str,
        body: ResponseBody,
    ) -> Result<ResponseBody, ApiError> {
        let event = ApiResponseEvent {
            method,
            url: url.to_string(),
            data: body.to_json(),
        };
        self.events.emit_serialized(API_RESPONSE, &event)?;
        Ok(body)
    }

    fn announce_error(&self, method: HttpMethod, url: &str, error: &ApiError) {
        warn!(url = %url, error = %error, "Request failed");

        let event = ApiErrorEvent {
            method,
            url: url.to_string(),
            error: error.to_string(),
            status: error.status(),
        };
        if let Err(listener_error) = self.events.emit_serialized(API_ERROR, &event) {
            warn!(url = %url, error = %listener_error, "api:error listener failed");
        }
    }
}
