//! The reachability state machine.

use chrono::{DateTime, Duration, Utc};
use drowse_types::ReachabilityState;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Timing parameters consumed by the state machine.
///
/// Supplied once at construction and immutable thereafter.
#[derive(Debug, Clone)]
pub struct TimingParams {
    /// Expected spacing between heartbeats.
    pub heartbeat_interval: Duration,

    /// How long a wake attempt may go unanswered before it is declared failed.
    pub wake_timeout: Duration,

    /// Missed heartbeat windows tolerated before `On` decays to `Off`.
    pub heartbeat_miss_threshold: u32,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::seconds(60),
            wake_timeout: Duration::seconds(120),
            heartbeat_miss_threshold: 3,
        }
    }
}

impl TimingParams {
    pub fn from_secs(
        heartbeat_interval_secs: u64,
        wake_timeout_secs: u64,
        heartbeat_miss_threshold: u32,
    ) -> Self {
        Self {
            heartbeat_interval: Duration::seconds(heartbeat_interval_secs as i64),
            wake_timeout: Duration::seconds(wake_timeout_secs as i64),
            heartbeat_miss_threshold,
        }
    }
}

/// Observational copy of the machine's fields for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state: ReachabilityState,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub wake_deadline_at: Option<DateTime<Utc>>,
    pub heartbeat_suppressed_until: Option<DateTime<Utc>>,
    pub consecutive_misses: u32,
}

/// State machine tracking whether the sleeper is on, off, waking, or failed.
///
/// States:
/// - `Off`    - no heartbeats; sleeper assumed asleep
/// - `Waking` - wake command issued; waiting for the first heartbeat
/// - `On`     - heartbeats flowing; sleeper confirmed alive
/// - `Failed` - wake command issued; `wake_timeout` elapsed with no heartbeat
///
/// Every operation takes `now` as a value so one logical instant is used
/// consistently within a transition, and so tests can drive arbitrary
/// elapsed time. The machine itself holds no lock; the daemon serializes
/// callers behind a single mutex. It is never persisted: a process restart
/// resets it to `Off` and the next heartbeat self-corrects within one
/// heartbeat interval.
#[derive(Debug)]
pub struct StateMachine {
    params: TimingParams,
    state: ReachabilityState,
    last_heartbeat_at: Option<DateTime<Utc>>,
    wake_deadline_at: Option<DateTime<Utc>>,
    heartbeat_suppressed_until: Option<DateTime<Utc>>,
    consecutive_misses: u32,
}

impl StateMachine {
    pub fn new(params: TimingParams) -> Self {
        Self {
            params,
            state: ReachabilityState::Off,
            last_heartbeat_at: None,
            wake_deadline_at: None,
            heartbeat_suppressed_until: None,
            consecutive_misses: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ReachabilityState {
        self.state
    }

    /// Copy of all observable fields.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            state: self.state,
            last_heartbeat_at: self.last_heartbeat_at,
            wake_deadline_at: self.wake_deadline_at,
            heartbeat_suppressed_until: self.heartbeat_suppressed_until,
            consecutive_misses: self.consecutive_misses,
        }
    }

    /// Transition: wake command issued (WoL packet about to be sent).
    ///
    /// From any state the machine ends up `Waking` with a fresh deadline;
    /// a repeat while already `Waking` only re-arms the deadline.
    pub fn wake_requested(&mut self, now: DateTime<Utc>) -> ReachabilityState {
        match self.state {
            ReachabilityState::Waking => {
                info!("state: WAKING -> WAKING (retry, re-arming deadline)");
            }
            prev => {
                info!(from = %prev, "state: {} -> WAKING (wake requested)", prev);
                self.state = ReachabilityState::Waking;
            }
        }
        self.wake_deadline_at = Some(now + self.params.wake_timeout);
        self.consecutive_misses = 0;
        self.state
    }

    /// Transition: a suspend has been issued for the sleeper.
    ///
    /// Valid from any state. Arms the heartbeat suppression window so
    /// in-flight heartbeats cannot bounce the machine straight back to `On`
    /// after a deliberate suspend. This records the waker's expectation;
    /// the orchestrator performs the actual suspend.
    pub fn suspend_requested(&mut self, now: DateTime<Utc>) -> ReachabilityState {
        let suppressed_until = now + self.params.heartbeat_interval * 2;
        info!(
            from = %self.state,
            until = %suppressed_until,
            "state: {} -> OFF (suspend acknowledged, heartbeats suppressed)",
            self.state
        );
        self.state = ReachabilityState::Off;
        self.wake_deadline_at = None;
        self.heartbeat_suppressed_until = Some(suppressed_until);
        self.consecutive_misses = 0;
        self.state
    }

    /// Process an incoming heartbeat from the sleeper.
    ///
    /// Heartbeats arriving inside the suppression window mutate nothing;
    /// they are logged and the current state is returned unchanged. A late
    /// heartbeat in `Failed` still recovers to `On`: the wake eventually
    /// succeeded.
    pub fn heartbeat_received(&mut self, now: DateTime<Utc>) -> ReachabilityState {
        if let Some(until) = self.heartbeat_suppressed_until {
            if now < until {
                info!(until = %until, "heartbeat suppressed after suspend, ignoring");
                return self.state;
            }
            self.heartbeat_suppressed_until = None;
        }

        self.last_heartbeat_at = Some(now);
        self.consecutive_misses = 0;

        match self.state {
            ReachabilityState::On => {
                debug!("state: ON (heartbeat refreshed)");
            }
            prev => {
                info!(from = %prev, "state: {} -> ON (heartbeat received)", prev);
                self.state = ReachabilityState::On;
                self.wake_deadline_at = None;
            }
        }
        self.state
    }

    /// Timer-driven transitions. The watchdog's only entry point.
    ///
    /// Repeated calls with a `now` that has not advanced past any deadline
    /// change nothing. Miss counting derives from elapsed whole heartbeat
    /// windows since the last accepted heartbeat, so a watchdog ticking
    /// faster than the heartbeat interval cannot inflate the count.
    pub fn check_timeouts(&mut self, now: DateTime<Utc>) -> ReachabilityState {
        match self.state {
            ReachabilityState::Waking => {
                if let Some(deadline) = self.wake_deadline_at {
                    if now >= deadline {
                        warn!(
                            wake_timeout_secs = self.params.wake_timeout.num_seconds(),
                            "state: WAKING -> FAILED (wake timeout exceeded)"
                        );
                        self.state = ReachabilityState::Failed;
                        self.wake_deadline_at = None;
                    }
                }
            }
            ReachabilityState::On => {
                if let Some(last) = self.last_heartbeat_at {
                    let elapsed = now - last;
                    let interval = self.params.heartbeat_interval.num_seconds().max(1);
                    let windows = (elapsed.num_seconds() / interval).max(0) as u32;

                    if windows > self.consecutive_misses {
                        self.consecutive_misses = windows;
                        warn!(
                            misses = self.consecutive_misses,
                            threshold = self.params.heartbeat_miss_threshold,
                            silent_secs = elapsed.num_seconds(),
                            "missed heartbeat window"
                        );
                    }

                    if self.consecutive_misses >= self.params.heartbeat_miss_threshold {
                        info!(
                            silent_secs = elapsed.num_seconds(),
                            "state: ON -> OFF (heartbeats stopped)"
                        );
                        self.state = ReachabilityState::Off;
                        self.last_heartbeat_at = None;
                        self.consecutive_misses = 0;
                    }
                }
            }
            ReachabilityState::Off | ReachabilityState::Failed => {}
        }
        self.state
    }
}
