use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use url::Url;

pub const OBFUSCATE_PATH: &str = "/api/obfuscate";
pub const DEFAULT_METHOD: &str = "prometheus";
pub const DEFAULT_PRESET: &str = "Medium";

#[derive(Debug, Error)]
pub enum ObfuscationError {
    #[error("Please enter a script to obfuscate")]
    EmptyScript,

    #[error("An obfuscation is already in progress")]
    AlreadyInFlight,

    /// Server rejected the request; carries the message shown to the user.
    #[error("{0}")]
    Rejected(String),

    #[error("obfuscation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid obfuscation endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Body of `POST /api/obfuscate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObfuscationRequest {
    pub method: String,
    pub preset: String,
    pub filename: String,
    pub script: String,
}

impl ObfuscationRequest {
    /// Request with the default preset and a timestamped `.lua` filename.
    pub fn new(method: impl Into<String>, script: impl Into<String>) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Self {
            method: method.into(),
            preset: DEFAULT_PRESET.to_string(),
            filename: format!("input-{}.lua", millis),
            script: script.into(),
        }
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }
}

/// Turn an HTTP status and body into the obfuscated script or an error.
///
/// Success needs a 2xx status, `success: true` and a string `script`.
/// Anything else is a rejection whose message is the first truthy
/// `message` or `error` field, else `Request failed (<status>)`. A body that
/// is not JSON reads as `{}`.
pub fn interpret_response(status: u16, body: &str) -> Result<String, ObfuscationError> {
    let data: Value = serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Default::default()));

    if (200..300).contains(&status) && data.get("success") == Some(&Value::Bool(true)) {
        if let Some(Value::String(script)) = data.get("script") {
            return Ok(script.clone());
        }
    }

    let message = ["message", "error"]
        .into_iter()
        .filter_map(|key| data.get(key))
        .find(|v| is_truthy(v))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| format!("Request failed ({})", status));

    Err(ObfuscationError::Rejected(message))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// HTTP client for one obfuscation server
#[derive(Debug, Clone)]
pub struct ObfuscationClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl ObfuscationClient {
    /// Client for the server at `base`, e.g. `http://localhost:3000`.
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, ObfuscationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            http,
            endpoint: base.join(OBFUSCATE_PATH)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit a script and return the obfuscated result.
    pub async fn submit(&self, request: &ObfuscationRequest) -> Result<String, ObfuscationError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status, filename = %request.filename, "Obfuscation server answered");
        interpret_response(status, &body)
    }
}
