use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum_macros::Display;

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub user_id: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_persona: Option<String>,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "response".to_string()
}

/// Body sent to the provider's `/chat-messages` endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessagesPayload {
    pub inputs: Map<String, Value>,
    pub query: String,
    pub response_mode: &'static str,
    pub conversation_id: String,
    pub user: String,
    pub auto_generate_name: bool,
}

impl From<ChatRequest> for ChatMessagesPayload {
    fn from(req: ChatRequest) -> Self {
        Self {
            inputs: req.inputs,
            query: req.query,
            response_mode: "streaming",
            conversation_id: req.conversation_id,
            user: req.user_id,
            auto_generate_name: false,
        }
    }
}

// ============================================================================
// Presentation reports
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub content: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(
        default,
        rename = "numCards",
        alias = "numcard",
        alias = "num_cards",
        deserialize_with = "optional_count"
    )]
    pub num_cards: Option<u32>,
}

fn default_format() -> String {
    "presentation".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerationState {
    Pending,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

/// Job status as reported by the presentation service. Fields the gateway
/// does not interpret are passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStatus {
    pub status: GenerationState,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "gammaUrl")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ============================================================================
// Lenient scalar decoding
// ============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `3`, `"3"`, `""` or `null`.
fn optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid card count: {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid card count: {}", s))),
        Some(other) => Err(D::Error::custom(format!("invalid card count: {}", other))),
    }
}

/// Upstream identifiers arrive as strings or bare numbers.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected identifier, got {}", other))),
    }
}
