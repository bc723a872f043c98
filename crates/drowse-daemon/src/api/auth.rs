//! Shared-secret authentication middleware.

use crate::api::state::AppState;
use crate::error::ApiError;
use crate::peer::API_KEY_HEADER;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// Require the shared-secret header on protected routes.
///
/// Everything except `/` and `/health` goes through this. An empty
/// configured key never matches; validation rejects that config at
/// startup, but this keeps a misbuilt state from becoming an open door.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state.config.node.api_key.as_str();
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if !expected.is_empty() && key == expected => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}
