//! Background tunnel-client process lifecycle.
//!
//! The frpc binary is spawned detached with both output streams redirected to
//! a log file; the controller never waits on its exit. The handle is kept so
//! callers get an explicit [`TunnelProcess::shutdown`] path instead of an
//! implicitly leaked process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::info;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to open tunnel log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to spawn tunnel client {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },
}

/// Handle to the running tunnel-client process.
#[derive(Debug)]
pub struct TunnelProcess {
    child: Child,
    log_path: PathBuf,
}

/// Spawn `<binary> -c <config_path>` in the background, appending stdout and
/// stderr to `log_path`. Returns as soon as the process is started; a spawn
/// failure leaves no process behind.
pub fn spawn_tunnel(
    binary: &Path,
    config_path: &Path,
    log_path: &Path,
) -> Result<TunnelProcess, LaunchError> {
    let open = |path: &Path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LaunchError::LogFile {
                path: path.to_path_buf(),
                source,
            })
    };
    let stdout_log = open(log_path)?;
    let stderr_log = open(log_path)?;

    // kill_on_drop stays false: the tunnel must outlive this handle unless
    // shutdown() is called explicitly.
    let child = Command::new(binary)
        .arg("-c")
        .arg(config_path)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_log))
        .stderr(Stdio::from(stderr_log))
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            binary: binary.to_path_buf(),
            source,
        })?;

    info!(
        pid = child.id(),
        binary = %binary.display(),
        log = %log_path.display(),
        "tunnel client started"
    );

    Ok(TunnelProcess {
        child,
        log_path: log_path.to_path_buf(),
    })
}

impl TunnelProcess {
    /// OS process id, `None` once the child has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Terminate the tunnel client. Not called by the default flow (the
    /// tunnel is left running until the job environment is torn down), but
    /// available behind the `teardown` input and for tests.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        info!(pid = self.child.id(), "stopping tunnel client");
        self.child.kill().await
    }
}
