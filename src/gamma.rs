use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::dify::UpstreamError;
use crate::error::{AppError, ErrorContext, Result};
use crate::models::{GenerationStatus, ReportRequest};

const CREATE_TIMEOUT: Duration = Duration::from_secs(60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);

/// Relay to the presentation-generation service. Jobs are asynchronous: create
/// returns a generation id, status is polled by the caller.
#[derive(Clone)]
pub struct GammaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GammaClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn key(&self) -> Result<&str> {
        if self.api_key.is_empty() {
            Err(AppError::not_configured("GAMMA_API_KEY"))
        } else {
            Ok(&self.api_key)
        }
    }

    pub async fn create_generation(&self, request: &ReportRequest) -> Result<Value> {
        let key = self.key()?;
        let response = self
            .http
            .post(format!("{}/generations", self.base_url))
            .header("X-API-KEY", key)
            .timeout(CREATE_TIMEOUT)
            .json(&generation_body(request))
            .send()
            .await
            .context("creating presentation")?;

        if !response.status().is_success() {
            return Err(UpstreamError::from_response(response).await).context("creating presentation");
        }
        log::info!("presentation generation submitted ({})", request.format);
        response.json().await.context("reading generation response")
    }

    pub async fn generation_status(&self, generation_id: &str) -> Result<GenerationStatus> {
        let key = self.key()?;
        let response = self
            .http
            .get(format!("{}/generations/{}", self.base_url, generation_id))
            .header("X-API-KEY", key)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .context("polling generation")?;

        match response.status() {
            status if status.is_success() => response.json().await.context("reading generation status"),
            StatusCode::NOT_FOUND => Err(AppError::not_found("Generation ID")),
            _ => Err(UpstreamError::from_response(response).await).context("polling generation"),
        }
    }
}

fn generation_body(request: &ReportRequest) -> Value {
    json!({
        "inputText": request.content,
        "textMode": "preserve",
        "format": request.format,
        "cardSplit": "auto",
        "numCards": request.num_cards,
        "exportAs": "pptx",
        "additionalInstructions": format!(
            "Create a professional summary report about '{}'. Focus on key insights, decisions, and action items from the discussion.",
            request.content
        ),
        "textOptions": { "language": "en" },
        "imageOptions": {
            "source": "aiGenerated",
            "style": "photorealistic, minimal"
        }
    })
}
