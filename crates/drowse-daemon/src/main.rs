//! drowsed - waker/sleeper power-state coordination daemon
//!
//! One binary, two roles:
//! - waker: tracks the sleeper's inferred liveness, sends Wake-on-LAN,
//!   forwards suspend requests
//! - sleeper: suspends on request and emits heartbeats while up

use clap::Parser;
use drowse_daemon::error::{DaemonError, DaemonResult};
use drowse_daemon::{DaemonConfig, Server};
use drowse_types::Role;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Drowse daemon CLI
#[derive(Parser)]
#[command(name = "drowsed")]
#[command(about = "Drowse daemon - waker/sleeper power coordination", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DROWSE_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "DROWSE_LISTEN_ADDR")]
    listen: Option<String>,

    /// Role override (waker or sleeper)
    #[arg(short, long, env = "DROWSE_ROLE")]
    role: Option<Role>,

    /// Log level
    #[arg(long, env = "DROWSE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "DROWSE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(role) = cli.role {
        config.node.role = role;
    }

    // Invalid required settings are fatal; the process does not start.
    config.validate()?;

    println!(
        "drowsed {} | role: {} | listening: {}",
        env!("CARGO_PKG_VERSION"),
        config.node.role,
        config.server.listen_addr
    );

    Server::new(config).run().await
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn json_log_layer_builds() {
        // Mirrors the --json init path without installing the subscriber.
        let _subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new("info"))
            .with(tracing_subscriber::fmt::layer().json());
    }
}
