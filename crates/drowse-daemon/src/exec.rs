//! External command collaborators: Wake-on-LAN and suspend.
//!
//! The daemon never performs the power side effects itself; it shells out
//! to the configured executables. Traits at the seam so the orchestrator
//! tests can substitute mocks.

use crate::error::ApiError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

/// Outcome of an external command, reported back to HTTP callers.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Sends the Wake-on-LAN magic packet.
#[async_trait]
pub trait WolSender: Send + Sync {
    async fn send(&self, mac_address: &str) -> Result<CommandReport, ApiError>;
}

/// Issues the local suspend and reports os-level status.
#[async_trait]
pub trait SuspendExecutor: Send + Sync {
    /// Initiate a suspend. Spawned without waiting: once the command runs
    /// we are racing the system suspend against our own HTTP response, and
    /// the deployment relies on a short pre-suspend delay to let the
    /// response out.
    async fn suspend(&self) -> Result<CommandReport, ApiError>;

    /// Os-level status string (e.g. `running`, `degraded`).
    async fn status(&self) -> Result<CommandReport, ApiError>;
}

/// WoL sender backed by an etherwake-style executable.
///
/// Invocations are bounded by `timeout`; a hung executable becomes a
/// `SystemCommand` error rather than a stuck request. `output()` kills the
/// child when its future is dropped, so an expired invocation does not
/// leak a process.
pub struct EtherWake {
    exec_path: String,
    timeout: Duration,
}

impl EtherWake {
    pub fn new(exec_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            exec_path: exec_path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl WolSender for EtherWake {
    async fn send(&self, mac_address: &str) -> Result<CommandReport, ApiError> {
        let args = vec![self.exec_path.clone(), mac_address.to_string()];
        info!(exec = %self.exec_path, mac = %mac_address, "Sending wake-on-LAN packet");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.exec_path).arg(mac_address).output(),
        )
        .await
        .map_err(|_| ApiError::SystemCommand {
            message: "Wake command timed out".to_string(),
            command: args.join(" "),
            return_code: None,
            stderr: format!("no exit within {}s", self.timeout.as_secs_f64()),
        })?
        .map_err(|e| ApiError::SystemCommand {
            message: "Failed to run wake command".to_string(),
            command: args.join(" "),
            return_code: None,
            stderr: e.to_string(),
        })?;

        let report = CommandReport {
            args: args.clone(),
            returncode: output.status.code(),
            stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        };

        if !output.status.success() {
            return Err(ApiError::SystemCommand {
                message: "Wake command failed".to_string(),
                command: args.join(" "),
                return_code: output.status.code(),
                stderr: report.stderr.clone().unwrap_or_default(),
            });
        }

        Ok(report)
    }
}

/// Suspend executor backed by systemctl.
///
/// The status invocation is bounded by `timeout`; the suspend invocation
/// is spawned without waiting, so no bound applies there.
pub struct Systemctl {
    exec_path: String,
    suspend_verb: String,
    status_verb: String,
    timeout: Duration,
}

impl Systemctl {
    pub fn new(
        exec_path: impl Into<String>,
        suspend_verb: impl Into<String>,
        status_verb: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            exec_path: exec_path.into(),
            suspend_verb: suspend_verb.into(),
            status_verb: status_verb.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SuspendExecutor for Systemctl {
    async fn suspend(&self) -> Result<CommandReport, ApiError> {
        let args = vec![self.exec_path.clone(), self.suspend_verb.clone()];
        info!(exec = %self.exec_path, verb = %self.suspend_verb, "Initiating system suspend");

        Command::new(&self.exec_path)
            .arg(&self.suspend_verb)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ApiError::SystemCommand {
                message: "Failed to suspend system".to_string(),
                command: args.join(" "),
                return_code: None,
                stderr: e.to_string(),
            })?;

        Ok(CommandReport {
            args,
            returncode: None,
            stdout: None,
            stderr: None,
        })
    }

    async fn status(&self) -> Result<CommandReport, ApiError> {
        let args = vec![self.exec_path.clone(), self.status_verb.clone()];

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.exec_path).arg(&self.status_verb).output(),
        )
        .await
        .map_err(|_| ApiError::SystemCommand {
            message: "Status command timed out".to_string(),
            command: args.join(" "),
            return_code: None,
            stderr: format!("no exit within {}s", self.timeout.as_secs_f64()),
        })?
        .map_err(|e| ApiError::SystemCommand {
            message: "Failed to get system status".to_string(),
            command: args.join(" "),
            return_code: None,
            stderr: e.to_string(),
        })?;

        let report = CommandReport {
            args: args.clone(),
            returncode: output.status.code(),
            stdout: Some(
                String::from_utf8_lossy(&output.stdout)
                    .trim_end()
                    .to_string(),
            ),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        };

        if !output.status.success() {
            return Err(ApiError::SystemCommand {
                message: "Status command failed".to_string(),
                command: args.join(" "),
                return_code: output.status.code(),
                stderr: report.stderr.clone().unwrap_or_default(),
            });
        }

        Ok(report)
    }
}

/// Whether a configured executable exists and is executable, for `/health`.
pub fn command_availability(path: &str) -> Value {
    #[cfg(unix)]
    fn is_executable(meta: &std::fs::Metadata) -> bool {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    fn is_executable(_meta: &std::fs::Metadata) -> bool {
        true
    }

    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && is_executable(&meta) => json!({
            "available": true,
            "path": path,
            "error": Value::Null,
        }),
        Ok(_) => json!({
            "available": false,
            "error": format!("Command {} is not executable", path),
        }),
        Err(_) => json!({
            "available": false,
            "error": format!("Command {} not found", path),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_wol_executable_is_a_system_command_error() {
        let wol = EtherWake::new("/nonexistent/etherwake", Duration::from_secs(5));
        let err = wol.send("aa:bb:cc:dd:ee:ff").await.unwrap_err();
        assert!(matches!(err, ApiError::SystemCommand { .. }));
    }

    #[tokio::test]
    async fn hung_wol_command_times_out() {
        // `sleep` stands in for a wedged etherwake; the mac slot carries
        // its duration argument.
        let wol = EtherWake::new("/bin/sleep", Duration::from_millis(200));
        let err = wol.send("30").await.unwrap_err();
        match err {
            ApiError::SystemCommand { message, .. } => {
                assert!(message.contains("timed out"), "got: {}", message);
            }
            other => panic!("expected SystemCommand, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn status_reports_trimmed_stdout() {
        // `echo` stands in for systemctl; any unix box has it.
        let exec = Systemctl::new("/bin/echo", "suspend", "running", Duration::from_secs(5));
        let report = exec.status().await.unwrap();
        assert_eq!(report.stdout.as_deref(), Some("running"));
        assert_eq!(report.returncode, Some(0));
    }

    #[tokio::test]
    async fn hung_status_command_times_out() {
        let exec = Systemctl::new("/bin/sleep", "suspend", "30", Duration::from_millis(200));
        let err = exec.status().await.unwrap_err();
        match err {
            ApiError::SystemCommand { message, .. } => {
                assert!(message.contains("timed out"), "got: {}", message);
            }
            other => panic!("expected SystemCommand, got {:?}", other),
        }
    }

    #[test]
    fn availability_of_a_real_binary() {
        let report = command_availability("/bin/sh");
        assert_eq!(report["available"], true);
    }

    #[test]
    fn availability_of_a_missing_binary() {
        let report = command_availability("/nonexistent/etherwake");
        assert_eq!(report["available"], false);
    }
}
