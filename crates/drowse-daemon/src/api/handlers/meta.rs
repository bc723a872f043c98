//! Unauthenticated liveness endpoints.

use crate::api::state::AppState;
use crate::exec::command_availability;
use axum::extract::State;
use axum::Json;
use drowse_types::Role;
use serde::Serialize;
use serde_json::{Map, Value};

/// Welcome endpoint.
pub async fn welcome() -> &'static str {
    "Welcome to drowse!"
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub config: ConfigHealth,
    pub commands: Value,
}

/// Config portion of the health report.
#[derive(Debug, Serialize)]
pub struct ConfigHealth {
    pub valid: bool,
    pub role: Role,
    pub errors: Vec<String>,
}

/// Comprehensive health check: config validity plus availability of the
/// external commands the active role depends on.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let errors = state.config.validation_errors();
    let config_valid = errors.is_empty();

    let mut commands = Map::new();
    match state.role() {
        Role::Waker => {
            commands.insert(
                "wol".to_string(),
                command_availability(&state.config.node.waker.wol_exec),
            );
        }
        Role::Sleeper => {
            commands.insert(
                "systemctl".to_string(),
                command_availability(&state.config.node.sleeper.systemctl_exec),
            );
        }
    }

    let commands_healthy = commands
        .values()
        .all(|report| report["available"] == Value::Bool(true));

    let status = if config_valid && commands_healthy {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthCheckResponse {
        status: status.to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        config: ConfigHealth {
            valid: config_valid,
            role: state.role(),
            errors,
        },
        commands: Value::Object(commands),
    })
}
