//! Shared types for the Drowse waker/sleeper coordination pair.
//!
//! Plain data: node roles, the inferred reachability state, the heartbeat
//! wire message, and the configuration drift checksum. No I/O lives here.

#![deny(unsafe_code)]

mod checksum;
mod role;
mod state;

pub use checksum::config_checksum;
pub use role::Role;
pub use state::ReachabilityState;

use serde::{Deserialize, Serialize};

/// Heartbeat announcement sent from the sleeper to the waker.
///
/// The checksum is carried purely for drift *detection*: a mismatch is
/// logged by the receiver, never enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatSignal {
    /// Hostname of the sending machine.
    pub hostname: String,

    /// Checksum of the sender's shared configuration sections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_checksum: Option<String>,
}

impl HeartbeatSignal {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            config_checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.config_checksum = Some(checksum.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_omits_absent_checksum() {
        let signal = HeartbeatSignal::new("sleeper-box");
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["hostname"], "sleeper-box");
        assert!(json.get("config_checksum").is_none());
    }

    #[test]
    fn heartbeat_round_trips_with_checksum() {
        let signal = HeartbeatSignal::new("sleeper-box").with_checksum("abcd1234abcd1234");
        let json = serde_json::to_string(&signal).unwrap();
        let back: HeartbeatSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(back.config_checksum.as_deref(), Some("abcd1234abcd1234"));
    }
}
