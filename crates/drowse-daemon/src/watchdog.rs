//! Timeout watchdog.
//!
//! Periodic background task feeding wall-clock time into the state machine
//! so silence becomes a transition. Runs only on the waker.

use crate::orchestrator::SharedMachine;
use drowse_core::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info};

pub struct Watchdog {
    machine: SharedMachine,
    clock: Arc<dyn Clock>,
    tick_period: Duration,
    running: Arc<RwLock<bool>>,
}

impl Watchdog {
    pub fn new(machine: SharedMachine, clock: Arc<dyn Clock>, tick_period: Duration) -> Arc<Self> {
        Arc::new(Self {
            machine,
            clock,
            tick_period,
            running: Arc::new(RwLock::new(false)),
        })
    }

    /// Run the tick loop until stopped.
    ///
    /// Each tick reads the clock once and applies `check_timeouts` under
    /// the machine lock; a tick never blocks on anything else. The running
    /// flag is checked before the mutation, so shutdown abandons a tick
    /// rather than half-applying it.
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        info!(
            tick_secs = self.tick_period.as_secs(),
            "Watchdog started"
        );

        let mut ticker = interval(self.tick_period);

        loop {
            ticker.tick().await;

            {
                let running = self.running.read().await;
                if !*running {
                    break;
                }
            }

            let now = self.clock.now();
            let state = {
                let mut machine = self.machine.lock().await;
                machine.check_timeouts(now)
            };
            debug!(state = %state, "Watchdog tick");
        }

        info!("Watchdog stopped");
    }

    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drowse_core::{ManualClock, StateMachine, TimingParams};
    use drowse_types::ReachabilityState;
    use tokio::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn watchdog_fails_a_stalled_wake() {
        let clock = Arc::new(ManualClock::at_epoch());
        let machine: SharedMachine =
            Arc::new(Mutex::new(StateMachine::new(TimingParams::default())));

        machine.lock().await.wake_requested(clock.now());

        let watchdog = Watchdog::new(machine.clone(), clock.clone(), Duration::from_secs(10));
        let handle = tokio::spawn(watchdog.clone().start());

        // Nothing answers the wake for 121 logical seconds.
        clock.advance(chrono::Duration::seconds(121));
        tokio::time::sleep(Duration::from_secs(21)).await;

        assert_eq!(machine.lock().await.state(), ReachabilityState::Failed);

        watchdog.stop().await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_watchdog_stops_ticking() {
        let clock = Arc::new(ManualClock::at_epoch());
        let machine: SharedMachine =
            Arc::new(Mutex::new(StateMachine::new(TimingParams::default())));

        let watchdog = Watchdog::new(machine.clone(), clock.clone(), Duration::from_secs(10));
        let handle = tokio::spawn(watchdog.clone().start());
        tokio::time::sleep(Duration::from_secs(1)).await;

        watchdog.stop().await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(handle.is_finished());

        // A wake that times out after shutdown is nobody's business.
        machine.lock().await.wake_requested(clock.now());
        clock.advance(chrono::Duration::seconds(500));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(machine.lock().await.state(), ReachabilityState::Waking);
    }
}
