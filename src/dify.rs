use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::error::{AppError, Result};
use crate::models::ChatMessagesPayload;

// ============================================================================
// Upstream errors
// ============================================================================

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,
    /// Non-success answer. Displays the response body verbatim.
    #[error("{body}")]
    Status { status: u16, body: String },
    #[error("upstream connection failed: {0}")]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

impl UpstreamError {
    /// Reads the whole body of a non-success response.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => Self::Status { status, body },
            Err(e) => e.into(),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client for the conversational provider's `/chat-messages` endpoint.
#[derive(Clone)]
pub struct DifyClient {
    http: reqwest::Client,
    base_url: String,
}

impl DifyClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Opens a streaming chat call. Resolves once response headers arrive; a
    /// non-2xx answer is turned into [`UpstreamError::Status`] with its body.
    pub async fn chat_messages(
        &self,
        api_key: &str,
        payload: &ChatMessagesPayload,
    ) -> std::result::Result<reqwest::Response, UpstreamError> {
        let response = self
            .http
            .post(format!("{}/chat-messages", self.base_url))
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::from_response(response).await);
        }
        Ok(response)
    }
}

// ============================================================================
// Per-persona API keys
// ============================================================================

/// API keys grouped by persona, then by mode (`response`, `search`,
/// `thinking`, `default`, ...).
#[derive(Debug, Clone, Default)]
pub struct DifyKeys {
    personas: HashMap<String, HashMap<String, String>>,
}

impl DifyKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(
        mut self,
        persona: impl Into<String>,
        mode: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.personas
            .entry(persona.into())
            .or_default()
            .insert(mode.into(), key.into());
        self
    }

    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self::new()
            .with_key("TECH", "response", var("DIFY_KEY_TECH_RESPONSE"))
            .with_key("TECH", "search", var("DIFY_KEY_TECH_SEARCH"))
            .with_key("TECH", "thinking", var("DIFY_KEY_TECH_THINKING"))
            .with_key("CEO", "default", var("DIFY_KEY_CEO"))
            .with_key("IR", "default", var("DIFY_KEY_IR"))
            .with_key("DISCUSS", "default", var("DIFY_KEY_DISCUSS"))
    }

    /// Key selection order: the exact mode if the persona lists it (an empty
    /// value there is final), otherwise `default`, otherwise `response`.
    pub fn resolve(&self, persona: &str, mode: &str) -> Option<&str> {
        fn non_empty(key: &String) -> Option<&str> {
            (!key.is_empty()).then_some(key.as_str())
        }

        let modes = self.personas.get(persona)?;
        if let Some(key) = modes.get(mode) {
            return non_empty(key);
        }
        modes
            .get("default")
            .and_then(non_empty)
            .or_else(|| modes.get("response").and_then(non_empty))
    }

    pub fn discuss(&self) -> Option<&str> {
        self.resolve("DISCUSS", "default")
    }
}
