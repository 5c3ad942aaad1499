use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::agents::{relay_stream, ChatAgent, DiscussAgent, StreamDecoder};
use crate::dify::DifyClient;
use crate::error::{AppError, Result};
use crate::init::AppState;
use crate::models::{ApiEnvelope, ChatMessagesPayload, ChatRequest, GenerationStatus, HealthResponse, ReportRequest};

pub fn create_app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/n1-talk", post(n1_talk_handler))
        .route("/api/discuss", post(discuss_handler))
        .route("/api/create-report", post(create_report_handler))
        .route("/api/status/{generation_id}", get(report_status_handler))
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "running" })
}

// ============================================================================
// SSE STREAM HANDLERS
// ============================================================================

/// One-to-one chat with a persona.
///
/// POST /api/n1-talk
/// Body: ChatRequest JSON (`target_persona`, optional `mode`)
pub async fn n1_talk_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let persona = request.target_persona.clone().unwrap_or_default();
    let key = state
        .keys
        .resolve(&persona, &request.mode)
        .ok_or_else(|| AppError::bad_request(format!("No API key configured for persona '{}'", persona)))?
        .to_string();

    log::info!("n1-talk: persona={} mode={} user={}", persona, request.mode, request.user_id);
    Ok(stream_response(state.dify.clone(), key, request, ChatAgent::new()))
}

/// Multi-agent discussion, demultiplexed into per-agent frames.
///
/// POST /api/discuss
/// Body: ChatRequest JSON
pub async fn discuss_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let key = state
        .keys
        .discuss()
        .ok_or_else(|| AppError::not_configured("DIFY_KEY_DISCUSS"))?
        .to_string();

    log::info!("discuss: user={}", request.user_id);
    let agent = DiscussAgent::new(state.roster.clone(), state.insight_marker.clone());
    Ok(stream_response(state.dify.clone(), key, request, agent))
}

fn stream_response<D: StreamDecoder>(
    client: DifyClient,
    api_key: String,
    request: ChatRequest,
    decoder: D,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let request_id = Uuid::now_v7();
    log::debug!("stream {} opened for user {}", request_id, request.user_id);
    let payload = ChatMessagesPayload::from(request);
    let stream = relay_stream(client, api_key, payload, decoder)
        .map(|event| Ok::<_, Infallible>(event.into_event()));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

// ============================================================================
// REPORT HANDLERS
// ============================================================================

/// POST /api/create-report
pub async fn create_report_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ApiEnvelope<Value>>> {
    let data = state.gamma.create_generation(&request).await?;
    Ok(Json(ApiEnvelope::success(data)))
}

/// GET /api/status/{generation_id}
pub async fn report_status_handler(
    State(state): State<Arc<AppState>>,
    Path(generation_id): Path<String>,
) -> Result<Json<ApiEnvelope<GenerationStatus>>> {
    let status = state.gamma.generation_status(&generation_id).await?;
    log::debug!("generation {} is {}", generation_id, status.status);
    Ok(Json(ApiEnvelope::success(status)))
}
