//! Server setup and lifecycle management.

use crate::api::{create_router, AppState};
use crate::config::DaemonConfig;
use crate::emitter::HeartbeatEmitter;
use crate::error::{DaemonError, DaemonResult};
use crate::exec::{EtherWake, SuspendExecutor, Systemctl};
use crate::orchestrator::{Orchestrator, SharedMachine};
use crate::peer::PeerClient;
use crate::watchdog::Watchdog;
use drowse_core::{StateMachine, SystemClock, TimingParams};
use drowse_types::{HeartbeatSignal, Role};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Drowse daemon server.
pub struct Server {
    config: Arc<DaemonConfig>,
}

impl Server {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run the server until shutdown.
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let timing = &self.config.timing;

        let mut watchdog: Option<Arc<Watchdog>> = None;
        let mut emitter: Option<Arc<HeartbeatEmitter>> = None;

        let state = match self.config.node.role {
            Role::Waker => {
                let machine: SharedMachine = Arc::new(Mutex::new(StateMachine::new(
                    TimingParams::from_secs(
                        timing.heartbeat_interval_secs,
                        timing.wake_timeout_secs,
                        timing.heartbeat_miss_threshold,
                    ),
                )));
                let clock = Arc::new(SystemClock);

                let peer = Arc::new(PeerClient::new(
                    self.config.peer_base_url(),
                    self.config.node.api_key.clone(),
                    self.config.server.request_timeout(),
                )?);

                let orchestrator = Arc::new(Orchestrator::new(
                    machine.clone(),
                    clock.clone(),
                    Arc::new(EtherWake::new(
                        self.config.node.waker.wol_exec.clone(),
                        Duration::from_secs(timing.command_timeout_secs),
                    )),
                    peer,
                    self.config.node.sleeper.mac_address.clone(),
                    self.config.shared_checksum(),
                ));

                let dog = Watchdog::new(
                    machine,
                    clock,
                    Duration::from_secs(timing.watchdog_interval_secs),
                );
                tokio::spawn(dog.clone().start());
                watchdog = Some(dog);

                AppState::new(self.config.clone(), Some(orchestrator), None)
            }
            Role::Sleeper => {
                let suspend: Arc<dyn SuspendExecutor> = Arc::new(Systemctl::new(
                    self.config.node.sleeper.systemctl_exec.clone(),
                    self.config.node.sleeper.suspend_verb.clone(),
                    self.config.node.sleeper.status_verb.clone(),
                    Duration::from_secs(timing.command_timeout_secs),
                ));

                // Heartbeat sends must finish strictly inside one interval.
                let send_timeout = self.config.server.request_timeout().min(Duration::from_secs(
                    timing.heartbeat_interval_secs.saturating_sub(1).max(1),
                ));
                let peer = Arc::new(PeerClient::new(
                    self.config.peer_base_url(),
                    self.config.node.api_key.clone(),
                    send_timeout,
                )?);

                let signal = HeartbeatSignal::new(local_hostname(&self.config))
                    .with_checksum(self.config.shared_checksum());
                let beat = HeartbeatEmitter::new(
                    peer,
                    signal,
                    Duration::from_secs(timing.heartbeat_interval_secs),
                );
                tokio::spawn(beat.clone().start());
                emitter = Some(beat);

                AppState::new(self.config.clone(), None, Some(suspend))
            }
        };

        let app = create_router(state);
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(addr = %addr, role = %self.config.node.role, "drowse daemon listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("drowse daemon shutting down");

        if let Some(dog) = watchdog {
            dog.stop().await;
        }
        if let Some(beat) = emitter {
            beat.stop().await;
        }

        Ok(())
    }
}

/// Hostname announced on heartbeats; falls back to the configured name.
fn local_hostname(config: &DaemonConfig) -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| config.node.sleeper.name.clone())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
