//! Drowse daemon library
//!
//! Core components of the waker/sleeper coordination daemon:
//! - HTTP API (status, wake, suspend, heartbeat ingress)
//! - Command orchestration and external side effects
//! - Timeout watchdog and heartbeat emitter background loops
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod emitter;
pub mod error;
pub mod exec;
pub mod orchestrator;
pub mod peer;
pub mod server;
pub mod watchdog;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;
