use log::{debug, error, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// The one error every backend call fails with. Callers only ever see a
/// human-readable message, never a transport status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Payload attached to a request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    /// Sent as multipart form data under the `file` field
    File { file_name: String, bytes: Vec<u8> },
}

/// Thin wrapper around `reqwest` that pins the base address and normalizes
/// every failure into `RequestError`. Single attempt per call: no retries,
/// no caching.
#[derive(Clone, Debug)]
pub struct RequestClient {
    client: Client,
    base_url: String,
}

impl RequestClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, RequestError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            RequestError::new(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn call(
        &self,
        path: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<Value, RequestError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("➡️ {} {}", method, url);

        let mut request = self.client.request(method.clone(), &url);
        match body {
            Some(RequestBody::Json(value)) => {
                request = request.json(&value);
            }
            Some(RequestBody::File { file_name, bytes }) => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("text/csv")
                    .map_err(|e| RequestError::new(format!("Invalid upload payload: {}", e)))?;
                request = request.multipart(Form::new().part("file", part));
            }
            None => {}
        }

        let response = request.send().await.map_err(|e| {
            error!("❌ {} {} failed to send: {}", method, url, e);
            transport_error(&e)
        })?;

        let status = response.status();
        if !status.is_success() {
            // An unreadable error body still falls back to the status text.
            let body = match response.bytes().await {
                Ok(body) => body.to_vec(),
                Err(e) => {
                    warn!("{} {} -> {}: could not read error body: {}", method, url, status, e);
                    Vec::new()
                }
            };
            let message = error_message(status, &body);
            error!("❌ {} {} -> {}: {}", method, url, status, message);
            return Err(RequestError::new(message));
        }

        let bytes = response.bytes().await.map_err(|e| {
            error!("❌ {} {} failed reading body: {}", method, url, e);
            transport_error(&e)
        })?;

        debug!("⬅️ {} {} -> {} ({} bytes)", method, url, status, bytes.len());
        serde_json::from_slice(&bytes).map_err(|e| {
            error!("❌ {} {} returned undecodable JSON: {}", method, url, e);
            RequestError::new(format!("Invalid JSON response: {}", e))
        })
    }
}

fn transport_error(e: &reqwest::Error) -> RequestError {
    if e.is_timeout() {
        RequestError::new("Request timed out")
    } else if e.is_connect() {
        RequestError::new(format!("Could not reach the analytics service: {}", e))
    } else {
        RequestError::new(format!("Request failed: {}", e))
    }
}

/// Message for a non-success response: the JSON `detail` field when there is
/// one, the status text otherwise.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<Value>(body) {
        match parsed.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => return detail.clone(),
            Some(Value::Null) | None => {}
            Some(Value::String(_)) => {}
            Some(other) => return other.to_string(),
        }
    }
    match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => format!("Request failed with status {}", status.as_u16()),
    }
}
