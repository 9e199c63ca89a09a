//! Remote-login activation: make sure the host's sshd accepts connections.
//!
//! This runs before any other provisioning work; an OS family without a
//! known activation command is a fatal configuration error.

use anyhow::Result;

use crate::cmd::{command_exists, run_cmd};
use crate::config::ConfigError;

/// Enable the inbound remote-login service for the host OS family.
pub fn ensure_enabled() -> Result<()> {
    supported(std::env::consts::OS)?;
    match std::env::consts::OS {
        "linux" => {
            if command_exists("systemctl") {
                run_cmd("starting sshd", "sudo", &["systemctl", "start", "ssh"])
            } else {
                run_cmd("starting sshd", "sudo", &["service", "ssh", "start"])
            }
        }
        "macos" => run_cmd(
            "enabling remote login",
            "sudo",
            &["systemsetup", "-setremotelogin", "on"],
        ),
        // Unreachable past the supported() check.
        other => Err(ConfigError::UnsupportedPlatform(other.to_string()).into()),
    }
}

/// Check whether the OS family has a remote-login activation path.
pub(crate) fn supported(os: &str) -> Result<(), ConfigError> {
    match os {
        "linux" | "macos" => Ok(()),
        other => Err(ConfigError::UnsupportedPlatform(other.to_string())),
    }
}
