//! Application state for API handlers.

use crate::config::DaemonConfig;
use crate::error::{ApiError, ApiResult};
use crate::exec::SuspendExecutor;
use crate::orchestrator::Orchestrator;
use drowse_types::Role;
use std::sync::Arc;

/// Shared application state.
///
/// Role-dependent components are optional: the orchestrator exists only on
/// the waker, the suspend executor only on the sleeper. The router mounts
/// routes to match, so a handler finding its component absent is a 404,
/// never a panic.
#[derive(Clone)]
pub struct AppState {
    /// Immutable process configuration
    pub config: Arc<DaemonConfig>,

    /// Waker-side command orchestration
    pub orchestrator: Option<Arc<Orchestrator>>,

    /// Sleeper-side suspend executor
    pub suspend: Option<Arc<dyn SuspendExecutor>>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: Arc<DaemonConfig>,
        orchestrator: Option<Arc<Orchestrator>>,
        suspend: Option<Arc<dyn SuspendExecutor>>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            suspend,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.config.node.role
    }

    pub fn orchestrator(&self) -> ApiResult<&Arc<Orchestrator>> {
        self.orchestrator
            .as_ref()
            .ok_or_else(|| ApiError::NotFound("waker role is not active on this node".to_string()))
    }

    pub fn suspend_exec(&self) -> ApiResult<&Arc<dyn SuspendExecutor>> {
        self.suspend
            .as_ref()
            .ok_or_else(|| ApiError::NotFound("sleeper role is not active on this node".to_string()))
    }

    /// Uptime as a human-readable string.
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
