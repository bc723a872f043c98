//! Heartbeat emitter.
//!
//! Sleeper-side background loop announcing liveness to the waker once per
//! heartbeat interval. A failed send is logged and retried on the next
//! tick; nothing stops this loop short of process shutdown.

use crate::peer::PeerGateway;
use drowse_types::HeartbeatSignal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info, warn};

pub struct HeartbeatEmitter {
    peer: Arc<dyn PeerGateway>,
    signal: HeartbeatSignal,
    period: Duration,
    running: Arc<RwLock<bool>>,
}

impl HeartbeatEmitter {
    pub fn new(peer: Arc<dyn PeerGateway>, signal: HeartbeatSignal, period: Duration) -> Arc<Self> {
        Arc::new(Self {
            peer,
            signal,
            period,
            running: Arc::new(RwLock::new(false)),
        })
    }

    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        info!(
            period_secs = self.period.as_secs(),
            hostname = %self.signal.hostname,
            "Heartbeat emitter started"
        );

        let mut ticker = interval(self.period);

        loop {
            ticker.tick().await;

            {
                let running = self.running.read().await;
                if !*running {
                    break;
                }
            }

            match self.peer.post_heartbeat(&self.signal).await {
                Ok(_) => debug!("Heartbeat delivered"),
                Err(e) => warn!(error = %e, "Heartbeat failed, will retry next tick"),
            }
        }

        info!("Heartbeat emitter stopped");
    }

    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::peer::PeerResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingPeer {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl PeerGateway for FailingPeer {
        async fn get(&self, _path: &str) -> Result<PeerResponse, ApiError> {
            Err(ApiError::PeerTimeout)
        }

        async fn post_heartbeat(
            &self,
            _signal: &HeartbeatSignal,
        ) -> Result<PeerResponse, ApiError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::Network {
                message: "Peer responded with error code 500".into(),
                details: json!({}),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sends_keep_the_loop_ticking() {
        let peer = Arc::new(FailingPeer {
            attempts: AtomicU32::new(0),
        });
        let emitter = HeartbeatEmitter::new(
            peer.clone(),
            HeartbeatSignal::new("vault"),
            Duration::from_secs(60),
        );
        let handle = tokio::spawn(emitter.clone().start());

        // Three full periods of nothing but failures.
        tokio::time::sleep(Duration::from_secs(185)).await;
        assert!(peer.attempts.load(Ordering::SeqCst) >= 3);
        assert!(!handle.is_finished());

        emitter.stop().await;
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(handle.is_finished());
    }
}
