//! Command orchestration on the waker.
//!
//! Drives the state machine from operator commands and incoming heartbeats,
//! and triggers the external side effects (WoL send, forwarded suspend).
//! The state machine reflects *expectation*, not confirmed execution: a
//! failed side effect is reported to the caller but never rolls a
//! transition back. The watchdog sorts out reality.

use crate::error::ApiError;
use crate::exec::{CommandReport, WolSender};
use crate::peer::{PeerGateway, PeerResponse};
use drowse_core::{Clock, StateMachine, StateSnapshot};
use drowse_types::{HeartbeatSignal, ReachabilityState};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The single shared state machine instance, serialized behind one lock.
///
/// No `.await` on network or disk happens while the lock is held; side
/// effects run strictly outside the locked section.
pub type SharedMachine = Arc<Mutex<StateMachine>>;

/// Result of a wake command.
#[derive(Debug)]
pub struct WakeOutcome {
    pub state: ReachabilityState,
    pub report: CommandReport,
}

/// Result of a forwarded suspend.
#[derive(Debug)]
pub struct SuspendOutcome {
    pub state: ReachabilityState,
    pub peer_response: PeerResponse,
}

pub struct Orchestrator {
    machine: SharedMachine,
    clock: Arc<dyn Clock>,
    wol: Arc<dyn WolSender>,
    peer: Arc<dyn PeerGateway>,
    sleeper_mac: String,
    own_checksum: String,
}

impl Orchestrator {
    pub fn new(
        machine: SharedMachine,
        clock: Arc<dyn Clock>,
        wol: Arc<dyn WolSender>,
        peer: Arc<dyn PeerGateway>,
        sleeper_mac: String,
        own_checksum: String,
    ) -> Self {
        Self {
            machine,
            clock,
            wol,
            peer,
            sleeper_mac,
            own_checksum,
        }
    }

    /// Current observable machine state, for the status endpoint.
    pub async fn snapshot(&self) -> StateSnapshot {
        self.machine.lock().await.snapshot()
    }

    /// Issue a wake: transition first, WoL send second.
    ///
    /// If the WoL send fails the machine stays `WAKING` and the watchdog
    /// will move it to `FAILED` when no heartbeat follows. A missing MAC
    /// address is refused before any transition; it can only happen when
    /// the daemon is embedded without the startup validation.
    pub async fn wake(&self) -> Result<WakeOutcome, ApiError> {
        if self.sleeper_mac.trim().is_empty() {
            return Err(ApiError::Configuration(
                "node.sleeper.mac_address is not configured".to_string(),
            ));
        }

        let now = self.clock.now();
        let state = {
            let mut machine = self.machine.lock().await;
            machine.wake_requested(now)
        };

        let report = self.wol.send(&self.sleeper_mac).await?;

        Ok(WakeOutcome { state, report })
    }

    /// Forward a suspend to the sleeper and acknowledge it locally.
    ///
    /// The local transition happens once the forwarded call succeeds, or
    /// when the peer is judged unreachable-therefore-already-off. The
    /// unreachable case still surfaces as an error to the caller: a network
    /// partition looks identical to a successful suspend, and the caller
    /// deserves to know the command was not confirmed.
    pub async fn forward_suspend(&self) -> Result<SuspendOutcome, ApiError> {
        match self.peer.get("/sleeper/suspend").await {
            Ok(peer_response) => {
                let now = self.clock.now();
                let state = {
                    let mut machine = self.machine.lock().await;
                    machine.suspend_requested(now)
                };
                info!(state = %state, "Sleeper acknowledged suspend");
                Ok(SuspendOutcome {
                    state,
                    peer_response,
                })
            }
            Err(ApiError::PeerTimeout) => {
                // Unreachable is taken to mean already suspended.
                let now = self.clock.now();
                let state = {
                    let mut machine = self.machine.lock().await;
                    machine.suspend_requested(now)
                };
                warn!(
                    state = %state,
                    "Sleeper unreachable during suspend; treating as already off"
                );
                Err(ApiError::PeerTimeout)
            }
            Err(other) => Err(other),
        }
    }

    /// Feed an incoming heartbeat into the state machine.
    ///
    /// A checksum mismatch is logged as config drift and nothing more; the
    /// heartbeat still counts.
    pub async fn ingest_heartbeat(&self, signal: &HeartbeatSignal) -> ReachabilityState {
        if let Some(theirs) = &signal.config_checksum {
            if *theirs != self.own_checksum {
                warn!(
                    sender = %signal.hostname,
                    ours = %self.own_checksum,
                    theirs = %theirs,
                    "Configuration drift detected between waker and sleeper"
                );
            }
        }

        let now = self.clock.now();
        let mut machine = self.machine.lock().await;
        machine.heartbeat_received(now)
    }
}
