//! Optional bearer-key authentication.
//!
//! Token issuance happens outside this service. When `server.api_key` is
//! configured, protected routes require `Authorization: Bearer <key>`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

/// Middleware that validates the bearer key when one is configured.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    let Some(value) = req.headers().get("authorization") else {
        return ApiError::Unauthorized("Missing Authorization header".to_string()).into_response();
    };

    let Ok(value) = value.to_str() else {
        return ApiError::Unauthorized("Invalid Authorization header encoding".to_string())
            .into_response();
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if token == expected => next.run(req).await,
        _ => ApiError::Unauthorized("Invalid bearer token".to_string()).into_response(),
    }
}
