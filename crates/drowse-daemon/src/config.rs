//! Configuration for the drowse daemon.

use drowse_types::{config_checksum, Role};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;

/// Main daemon configuration.
///
/// Read once at startup and treated as immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Node identity and peer addressing
    #[serde(default)]
    pub node: NodeConfig,

    /// Heartbeat and timeout tuning
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            node: NodeConfig::default(),
            timing: TimingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Timeout for outbound peer requests, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// Bounded outbound request timeout.
    ///
    /// Floored slightly above 3s so a dropped SYN still gets one TCP
    /// retransmission window before we give up.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs.max(3.05))
    }
}

/// Node identity: which role this process plays and how to reach the peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Role of this process
    #[serde(default = "default_role")]
    pub role: Role,

    /// Shared secret expected in the X-Api-Key header
    #[serde(default)]
    pub api_key: String,

    /// DNS domain both machines live in
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Port the peer's daemon listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Waker-side settings
    #[serde(default)]
    pub waker: WakerConfig,

    /// Sleeper-side settings
    #[serde(default)]
    pub sleeper: SleeperConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            api_key: String::new(),
            domain: default_domain(),
            port: default_port(),
            waker: WakerConfig::default(),
            sleeper: SleeperConfig::default(),
        }
    }
}

/// Waker-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakerConfig {
    /// Hostname of the waker machine
    #[serde(default)]
    pub name: String,

    /// Wake-on-LAN executable
    #[serde(default = "default_wol_exec")]
    pub wol_exec: String,
}

impl Default for WakerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            wol_exec: default_wol_exec(),
        }
    }
}

/// Sleeper-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeperConfig {
    /// Hostname of the sleeper machine
    #[serde(default)]
    pub name: String,

    /// MAC address targeted by the WoL packet
    #[serde(default)]
    pub mac_address: String,

    /// systemctl executable on the sleeper
    #[serde(default = "default_systemctl_exec")]
    pub systemctl_exec: String,

    /// systemctl verb that suspends the machine
    #[serde(default = "default_suspend_verb")]
    pub suspend_verb: String,

    /// systemctl verb that reports os-level status
    #[serde(default = "default_status_verb")]
    pub status_verb: String,
}

impl Default for SleeperConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            mac_address: String::new(),
            systemctl_exec: default_systemctl_exec(),
            suspend_verb: default_suspend_verb(),
            status_verb: default_status_verb(),
        }
    }
}

/// Heartbeat and timeout tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Expected heartbeat spacing in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Wake attempt timeout in seconds
    #[serde(default = "default_wake_timeout")]
    pub wake_timeout_secs: u64,

    /// Missed heartbeat windows tolerated before ON decays to OFF
    #[serde(default = "default_miss_threshold")]
    pub heartbeat_miss_threshold: u32,

    /// Watchdog tick period in seconds
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_secs: u64,

    /// Bound on external command invocations (WoL, status), in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            wake_timeout_secs: default_wake_timeout(),
            heartbeat_miss_threshold: default_miss_threshold(),
            watchdog_interval_secs: default_watchdog_interval(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], default_port()))
}

fn default_request_timeout() -> f64 {
    4.0
}

fn default_role() -> Role {
    Role::Waker
}

fn default_domain() -> String {
    "localdomain".to_string()
}

fn default_port() -> u16 {
    51339
}

fn default_wol_exec() -> String {
    "/usr/sbin/etherwake".to_string()
}

fn default_systemctl_exec() -> String {
    "/usr/bin/systemctl".to_string()
}

fn default_suspend_verb() -> String {
    "suspend".to_string()
}

fn default_status_verb() -> String {
    "is-system-running".to_string()
}

fn default_heartbeat_interval() -> u64 {
    60
}

fn default_wake_timeout() -> u64 {
    120
}

fn default_miss_threshold() -> u32 {
    3
}

fn default_watchdog_interval() -> u64 {
    10
}

fn default_command_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file, and the
    /// environment (`DROWSE_` prefix).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DROWSE")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Validate role-dependent required settings.
    ///
    /// Returns every problem found rather than the first one, so operators
    /// can fix a config file in one pass. An empty list means the config is
    /// usable.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.node.api_key.trim().is_empty() {
            errors.push("node.api_key is required".to_string());
        }

        match self.node.role {
            Role::Waker => {
                if self.node.sleeper.name.trim().is_empty() {
                    errors.push("node.sleeper.name is required for the waker role".to_string());
                }
                if self.node.sleeper.mac_address.trim().is_empty() {
                    errors
                        .push("node.sleeper.mac_address is required for the waker role".to_string());
                }
                if self.node.waker.wol_exec.trim().is_empty() {
                    errors.push("node.waker.wol_exec is required for the waker role".to_string());
                }
            }
            Role::Sleeper => {
                if self.node.waker.name.trim().is_empty() {
                    errors.push("node.waker.name is required for the sleeper role".to_string());
                }
                if self.node.sleeper.systemctl_exec.trim().is_empty() {
                    errors.push(
                        "node.sleeper.systemctl_exec is required for the sleeper role".to_string(),
                    );
                }
            }
        }

        if self.timing.heartbeat_interval_secs == 0 {
            errors.push("timing.heartbeat_interval_secs must be positive".to_string());
        }
        if self.timing.wake_timeout_secs == 0 {
            errors.push("timing.wake_timeout_secs must be positive".to_string());
        }
        if self.timing.heartbeat_miss_threshold == 0 {
            errors.push("timing.heartbeat_miss_threshold must be at least 1".to_string());
        }
        if self.timing.watchdog_interval_secs == 0 {
            errors.push("timing.watchdog_interval_secs must be positive".to_string());
        }
        if self.timing.command_timeout_secs == 0 {
            errors.push("timing.command_timeout_secs must be positive".to_string());
        }

        errors
    }

    /// Validate, failing with a single aggregated message.
    pub fn validate(&self) -> Result<(), crate::error::DaemonError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(crate::error::DaemonError::Config(errors.join("; ")))
        }
    }

    /// Base URL of the peer this node talks to.
    ///
    /// The waker addresses the sleeper and vice versa.
    pub fn peer_base_url(&self) -> String {
        let peer_name = match self.node.role {
            Role::Waker => &self.node.sleeper.name,
            Role::Sleeper => &self.node.waker.name,
        };
        format!("http://{}.{}:{}", peer_name, self.node.domain, self.node.port)
    }

    /// Drift checksum over the sections both nodes are expected to share.
    pub fn shared_checksum(&self) -> String {
        config_checksum(&SharedSections {
            domain: &self.node.domain,
            port: self.node.port,
            waker_name: &self.node.waker.name,
            sleeper_name: &self.node.sleeper.name,
            timing: &self.timing,
        })
    }

    /// Configuration as reported on the `/config` endpoints, with the
    /// shared secret redacted.
    pub fn redacted(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or_else(|_| json!({}));
        if let Some(node) = value.get_mut("node") {
            if let Some(key) = node.get_mut("api_key") {
                *key = json!("***hidden***");
            }
        }
        value
    }
}

/// Sections hashed into the drift checksum.
#[derive(Serialize)]
struct SharedSections<'a> {
    domain: &'a str,
    port: u16,
    waker_name: &'a str,
    sleeper_name: &'a str,
    timing: &'a TimingConfig,
}
