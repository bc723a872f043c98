//! Inferred reachability state of the sleeper.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The waker's inferred liveness state for the sleeper.
///
/// This is an inference from the last observed heartbeat and command
/// history, not a guarantee about the machine's true power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReachabilityState {
    /// No heartbeats. Sleeper is assumed asleep.
    Off,

    /// Wake command issued, waiting for the first heartbeat.
    Waking,

    /// Heartbeats flowing. Sleeper confirmed alive.
    On,

    /// Wake command issued but no heartbeat arrived within the timeout.
    Failed,
}

impl fmt::Display for ReachabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReachabilityState::Off => write!(f, "OFF"),
            ReachabilityState::Waking => write!(f, "WAKING"),
            ReachabilityState::On => write!(f, "ON"),
            ReachabilityState::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_rendering_is_uppercase() {
        assert_eq!(
            serde_json::to_string(&ReachabilityState::Waking).unwrap(),
            "\"WAKING\""
        );
        let back: ReachabilityState = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(back, ReachabilityState::Failed);
    }

    #[test]
    fn display_matches_wire_form() {
        for state in [
            ReachabilityState::Off,
            ReachabilityState::Waking,
            ReachabilityState::On,
            ReachabilityState::Failed,
        ] {
            let wire = serde_json::to_string(&state).unwrap();
            assert_eq!(wire, format!("\"{}\"", state));
        }
    }
}
