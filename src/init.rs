use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use crate::agents::{AgentRoster, DEFAULT_INSIGHT_MARKER};
use crate::dify::{DifyClient, DifyKeys};
use crate::error::Result;
use crate::gamma::GammaClient;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub dify: DifyConfig,
    pub gamma: GammaConfig,
    pub discuss: DiscussConfig,
}

#[derive(Debug, Clone)]
pub struct DifyConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub keys: DifyKeys,
}

#[derive(Debug, Clone)]
pub struct GammaConfig {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct DiscussConfig {
    pub roster: AgentRoster,
    pub insight_marker: String,
}

impl Config {
    pub fn from_env() -> std::result::Result<Self, Box<dyn Error>> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()?,
            dify: DifyConfig {
                api_url: std::env::var("DIFY_API_URL")
                    .unwrap_or_else(|_| "https://api.dify.ai/v1".to_string()),
                timeout: Duration::from_secs(
                    std::env::var("DIFY_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "300".to_string())
                        .parse()?,
                ),
                keys: DifyKeys::from_env(),
            },
            gamma: GammaConfig {
                api_url: std::env::var("GAMMA_API_URL")
                    .unwrap_or_else(|_| "https://public-api.gamma.app/v1.0".to_string()),
                api_key: std::env::var("GAMMA_API_KEY").unwrap_or_default(),
            },
            discuss: DiscussConfig {
                roster: AgentRoster::from_env()?,
                insight_marker: std::env::var("INSIGHT_MARKER")
                    .unwrap_or_else(|_| DEFAULT_INSIGHT_MARKER.to_string()),
            },
        })
    }
}

// ============================================================================
// Application state
// ============================================================================

/// Shared, read-only per process. Per-request stream state lives in the
/// decoders, never here.
#[derive(Clone)]
pub struct AppState {
    pub dify: DifyClient,
    pub gamma: GammaClient,
    pub keys: DifyKeys,
    pub roster: Arc<AgentRoster>,
    pub insight_marker: String,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            dify: DifyClient::new(&config.dify.api_url, config.dify.timeout)?,
            gamma: GammaClient::new(&config.gamma.api_url, &config.gamma.api_key),
            keys: config.dify.keys.clone(),
            roster: Arc::new(config.discuss.roster.clone()),
            insight_marker: config.discuss.insight_marker.clone(),
        })
    }
}

pub async fn app_init() -> std::result::Result<(Config, Arc<AppState>), Box<dyn Error>> {
    let config = Config::from_env()?;
    log::info!("✅ Configuration loaded");
    log::info!(
        "🤖 Discussion roster: {} titles, marker '{}'",
        config.discuss.roster.len(),
        config.discuss.insight_marker
    );
    if config.discuss.roster.is_empty() {
        log::warn!("⚠️  DISCUSS_AGENTS has no entries, discussion nodes will all be dropped");
    }
    if config.dify.keys.discuss().is_none() {
        log::warn!("⚠️  DIFY_KEY_DISCUSS is not set, /api/discuss will answer 500");
    }
    if config.gamma.api_key.is_empty() {
        log::warn!("⚠️  GAMMA_API_KEY is not set, report endpoints will answer 500");
    }

    let state = Arc::new(AppState::from_config(&config)?);
    Ok((config, state))
}
