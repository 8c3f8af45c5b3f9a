//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/body parameters via axum extractors,
//! calls into AppState services, and returns JSON (or audio) responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mindset_chat::Voice;
use mindset_core::types::{ProfileAttributes, UserProfile};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

/// Body of a profile write: the full attribute set, plus an optional id used
/// when the query string carries none.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub attributes: ProfileAttributes,
}

#[derive(Debug, Default, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub history_recorded: bool,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: &'static [Voice],
    pub default_voice: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - liveness and uptime. Never requires auth.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /chat - run one chat turn.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    let user_id = required(req.user_id, "user_id")?;
    let message = required(req.message, "message")?;

    let turn = state.chat.handle_turn(&user_id, &message).await?;
    if !turn.history_recorded {
        warn!(user_id = %user_id, "Reply returned without being recorded in history");
    }

    Ok(Json(ChatResponse {
        response: turn.response,
        history_recorded: turn.history_recorded,
    }))
}

/// GET /profile?user_id= - 404 when the user has never written a profile.
pub async fn get_profile(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let Query(query) = query?;
    let user_id = required(query.user_id, "user_id")?;

    state
        .profiles
        .get(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No profile for user '{}'", user_id)))
}

/// POST|PUT /profile?user_id= - replace the full attribute set.
pub async fn write_profile(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
    payload: Result<Json<ProfileBody>, JsonRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let Query(query) = query?;
    let Json(body) = payload?;

    let user_id = required(query.user_id.or(body.id), "user_id")?;
    let profile = state.profiles.put(&user_id, body.attributes).await?;

    info!(user_id = %user_id, "Profile updated");
    Ok(Json(profile))
}

/// POST /tts - synthesize speech, returned as `audio/mpeg`.
pub async fn tts(
    State(state): State<AppState>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let text = req.text.unwrap_or_default();

    let speech = state.speech.speak(&text, req.voice_id.as_deref()).await?;

    let mut response = speech.audio.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    headers.insert("x-voice-id", HeaderValue::from_static(speech.voice.id));
    headers.insert("x-voice-name", HeaderValue::from_static(speech.voice.name));
    Ok(response)
}

/// GET /voices - the voice catalog.
pub async fn voices(State(state): State<AppState>) -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: state.speech.catalog().all(),
        default_voice: state.config.speech.default_voice.clone(),
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{} is required", field))),
    }
}
