//! Request/response invocation of remote tools

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::{Result, ToolgateError};

/// Posts JSON payloads to tool endpoints
#[derive(Debug, Clone, Default)]
pub struct HttpInvoker {
    client: Client,
}

impl HttpInvoker {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// POST `payload` to `endpoint`
    ///
    /// A JSON response body is returned as-is; any other body comes back as a
    /// JSON string. Non-2xx statuses are transport failures.
    pub async fn invoke(&self, endpoint: &str, payload: &Value, timeout: Duration) -> Result<Value> {
        let response = self
            .client
            .post(endpoint)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify(e, timeout))?;

        if !status.is_success() {
            return Err(ToolgateError::ExecutionTransport(format!(
                "{} returned {}: {}",
                endpoint, status, body
            )));
        }

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> ToolgateError {
    if error.is_timeout() {
        ToolgateError::ExecutionTimeout(timeout.as_millis() as u64)
    } else {
        ToolgateError::ExecutionTransport(format!("Request failed: {}", error))
    }
}
