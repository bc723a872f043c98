//! Reachability state machine for the Drowse waker.
//!
//! This crate holds the daemon's single source of truth for the sleeper's
//! inferred power state: a pure, clock-driven state machine with no I/O.
//! The daemon feeds it from three directions (operator commands, incoming
//! heartbeats, the watchdog tick) and serializes those calls behind one
//! lock it owns.

#![deny(unsafe_code)]

mod clock;
mod machine;

pub use clock::{Clock, SystemClock};
pub use machine::{StateMachine, StateSnapshot, TimingParams};

#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
