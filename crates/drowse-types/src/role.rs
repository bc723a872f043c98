//! Node roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which half of the pair this process is running as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Issues wake commands and tracks the sleeper's inferred liveness.
    Waker,

    /// Can be suspended and later woken; emits heartbeats while up.
    Sleeper,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Waker => write!(f, "waker"),
            Role::Sleeper => write!(f, "sleeper"),
        }
    }
}

/// Error for an unrecognized role string.
#[derive(Debug, Error)]
#[error("unknown role: {0} (expected 'waker' or 'sleeper')")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "waker" => Ok(Role::Waker),
            "sleeper" => Ok(Role::Sleeper),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}
