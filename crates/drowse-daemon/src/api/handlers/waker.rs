//! Waker-role handlers.

use crate::api::state::AppState;
use crate::error::ApiResult;
use crate::exec::CommandReport;
use crate::peer::PeerResponse;
use axum::extract::State;
use axum::Json;
use drowse_core::StateSnapshot;
use drowse_types::{HeartbeatSignal, ReachabilityState};
use serde::Serialize;
use serde_json::Value;

/// Status response: the inferred reachability state plus the machine's
/// observable fields.
#[derive(Debug, Serialize)]
pub struct WakerStatusResponse {
    pub op: String,
    pub state: ReachabilityState,
    pub machine: StateSnapshot,
}

pub async fn waker_status(State(state): State<AppState>) -> ApiResult<Json<WakerStatusResponse>> {
    let snapshot = state.orchestrator()?.snapshot().await;
    Ok(Json(WakerStatusResponse {
        op: "status".to_string(),
        state: snapshot.state,
        machine: snapshot,
    }))
}

/// Wake response.
#[derive(Debug, Serialize)]
pub struct WakeResponse {
    pub op: String,
    pub state: ReachabilityState,
    pub sleeper: SleeperTarget,
    pub subprocess: CommandReport,
}

/// Identity of the machine being woken.
#[derive(Debug, Serialize)]
pub struct SleeperTarget {
    pub name: String,
    pub mac_address: String,
}

pub async fn wake(State(state): State<AppState>) -> ApiResult<Json<WakeResponse>> {
    let outcome = state.orchestrator()?.wake().await?;
    tracing::info!(
        sleeper = %state.config.node.sleeper.name,
        "Wake command sent"
    );
    Ok(Json(WakeResponse {
        op: "wake".to_string(),
        state: outcome.state,
        sleeper: SleeperTarget {
            name: state.config.node.sleeper.name.clone(),
            mac_address: state.config.node.sleeper.mac_address.clone(),
        },
        subprocess: outcome.report,
    }))
}

/// Forwarded suspend response.
#[derive(Debug, Serialize)]
pub struct WakerSuspendResponse {
    pub op: String,
    pub state: ReachabilityState,
    pub sleeper_response: PeerResponse,
}

pub async fn waker_suspend(
    State(state): State<AppState>,
) -> ApiResult<Json<WakerSuspendResponse>> {
    let outcome = state.orchestrator()?.forward_suspend().await?;
    Ok(Json(WakerSuspendResponse {
        op: "suspend".to_string(),
        state: outcome.state,
        sleeper_response: outcome.peer_response,
    }))
}

/// Heartbeat ingress response.
#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub op: String,
    pub state: ReachabilityState,
}

/// Heartbeat ingress. Does nothing beyond the machine call.
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(signal): Json<HeartbeatSignal>,
) -> ApiResult<Json<HeartbeatResponse>> {
    let new_state = state.orchestrator()?.ingest_heartbeat(&signal).await;
    Ok(Json(HeartbeatResponse {
        op: "heartbeat".to_string(),
        state: new_state,
    }))
}

pub async fn waker_config(State(state): State<AppState>) -> Json<Value> {
    Json(state.config.redacted())
}
