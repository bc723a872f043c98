//! Sleeper-role handlers.

use crate::api::state::AppState;
use crate::error::ApiResult;
use crate::exec::CommandReport;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Os-level status response.
#[derive(Debug, Serialize)]
pub struct SleeperStatusResponse {
    pub op: String,
    pub status: String,
    pub subprocess: CommandReport,
}

pub async fn sleeper_status(
    State(state): State<AppState>,
) -> ApiResult<Json<SleeperStatusResponse>> {
    let report = state.suspend_exec()?.status().await?;
    Ok(Json(SleeperStatusResponse {
        op: "status".to_string(),
        status: report.stdout.clone().unwrap_or_default(),
        subprocess: report,
    }))
}

/// Local suspend response.
#[derive(Debug, Serialize)]
pub struct SleeperSuspendResponse {
    pub op: String,
    pub subprocess: CommandReport,
}

/// Direct local suspend.
///
/// Once the command is spawned we are racing the system suspend against
/// this response; the deployment's pre-suspend delay gives it time to get
/// out.
pub async fn sleeper_suspend(
    State(state): State<AppState>,
) -> ApiResult<Json<SleeperSuspendResponse>> {
    let report = state.suspend_exec()?.suspend().await?;
    Ok(Json(SleeperSuspendResponse {
        op: "suspend".to_string(),
        subprocess: report,
    }))
}

pub async fn sleeper_config(State(state): State<AppState>) -> Json<Value> {
    Json(state.config.redacted())
}
