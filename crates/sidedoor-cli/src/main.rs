//! sidedoor — temporary SSH access into a CI runner over an frp reverse tunnel.
//!
//! The flow is strictly sequential: validate inputs, enable remote login,
//! install authorized keys (best effort), provision the frp client, resolve
//! and persist its configuration, spawn it in the background, publish the
//! public endpoint, then keep the job alive until the timeout budget is
//! spent. Every fatal error unifies here into a single non-zero exit.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use sidedoor_core::config::resolve_config;
use sidedoor_core::inputs::ActionInputs;
use sidedoor_core::keys::{self, KeySource};
use sidedoor_core::launcher::spawn_tunnel;
use sidedoor_core::logtail::{LogFileTail, StatusSource};
use sidedoor_core::provision::{DEFAULT_FRP_VERSION, Provisioner};
use sidedoor_core::session::{SessionState, run_keep_alive};
use sidedoor_core::{outputs, remote_login, tracing_init};

/// Raw action inputs, exactly as the CI environment hands them over. All
/// numeric coercion happens in one place, in `sidedoor_core::inputs`.
#[derive(Parser, Debug)]
#[command(
    name = "sidedoor",
    version,
    about = "Temporary SSH access into CI runners over an frp reverse tunnel"
)]
struct Args {
    /// Relay server host (required unless an explicit client config is given)
    #[arg(long, env = "INPUT_FRP_SERVER", default_value = "")]
    frp_server: String,

    /// Relay server port
    #[arg(long, env = "INPUT_FRP_SERVER_PORT", default_value = "7000")]
    frp_server_port: String,

    /// Shared secret for the relay
    #[arg(long, env = "INPUT_FRP_TOKEN", default_value = "", hide_env_values = true)]
    frp_token: String,

    /// Local port to expose (usually sshd's 22)
    #[arg(long, env = "INPUT_LOCAL_PORT")]
    local_port: Option<String>,

    /// Remote port to claim on the relay
    #[arg(long, env = "INPUT_REMOTE_PORT")]
    remote_port: Option<String>,

    /// Address the local service listens on
    #[arg(long, env = "INPUT_LOCAL_ADDRESS", default_value = "127.0.0.1")]
    local_address: String,

    /// Proxy protocol ("tcp" or "udp")
    #[arg(long, env = "INPUT_PROTOCOL", default_value = "tcp")]
    protocol: String,

    /// Full frpc configuration text, used verbatim instead of the port mapping
    #[arg(long, env = "INPUT_FRP_CLIENT_CONFIG")]
    frp_client_config: Option<String>,

    /// frp release to install
    #[arg(long, env = "INPUT_FRP_VERSION", default_value = DEFAULT_FRP_VERSION)]
    frp_version: String,

    /// Minutes to keep the session alive
    #[arg(long, env = "INPUT_TIMEOUT_MINUTES", default_value = "15")]
    timeout_minutes: String,

    /// Account whose public SSH keys get authorized (defaults to the actor
    /// that triggered the workflow)
    #[arg(long, env = "INPUT_SSH_USER")]
    ssh_user: Option<String>,

    /// Kill the tunnel client when the session expires instead of leaving it
    /// to the job environment's teardown
    #[arg(long, env = "INPUT_TEARDOWN", default_value = "false")]
    teardown: String,

    /// CI run identifier, part of the generated proxy name
    #[arg(long, env = "GITHUB_RUN_ID")]
    run_id: Option<String>,

    /// Directory for the frp binary, config and log
    #[arg(long, env = "SIDEDOOR_RUNTIME_DIR", default_value = "/tmp/sidedoor")]
    runtime_dir: PathBuf,

    /// Log level filter (e.g. "info", "debug")
    #[arg(long, env = "SIDEDOOR_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation)
    #[arg(long, env = "SIDEDOOR_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = format!(
        "sidedoor_cli={0},sidedoor_core={0},frpc={0}",
        args.log_level
    );
    tracing_init::init_tracing(&filter, args.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "starting sidedoor");
    run(args).await
}

async fn run(args: Args) -> anyhow::Result<()> {
    let run_id = args
        .run_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let inputs = ActionInputs {
        frp_server: args.frp_server,
        frp_server_port: args.frp_server_port,
        frp_token: args.frp_token,
        local_port: args.local_port,
        remote_port: args.remote_port,
        local_address: args.local_address,
        protocol: args.protocol,
        frp_client_config: args.frp_client_config,
        frp_version: args.frp_version,
        timeout_minutes: args.timeout_minutes,
        ssh_user: args
            .ssh_user
            .or_else(|| std::env::var("GITHUB_ACTOR").ok()),
        run_id,
        teardown: args.teardown,
    };
    let request = inputs.into_request()?;

    // Fatal on unsupported OS families, so it runs before any other work.
    remote_login::ensure_enabled()?;

    // Soft collaborator: a failed or empty key fetch degrades the session,
    // it never aborts it.
    match &request.ssh_user {
        Some(user) => authorize_keys(user).await,
        None => warn!("no ssh_user or GITHUB_ACTOR available, skipping remote-login authorization"),
    }

    let provisioner = Provisioner::new(args.runtime_dir.clone())?;
    let frpc = provisioner.install(&request.frp_version).await?;

    let config_path = args.runtime_dir.join("frpc.toml");
    resolve_config(&request)?
        .persist(&config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    let log_path = args.runtime_dir.join("frpc.log");
    let mut tunnel = spawn_tunnel(&frpc, &config_path, &log_path)?;

    let endpoint = request.public_endpoint();
    match &endpoint {
        Some(url) => {
            outputs::publish("public_url", url)?;
            info!(public_url = %url, "tunnel endpoint ready");
        }
        None => info!("public endpoint not derivable from an explicit client config"),
    }

    let timeout = Duration::from_secs(request.timeout_minutes * 60);
    info!(
        timeout_minutes = request.timeout_minutes,
        "keeping session alive"
    );
    let mut state = SessionState::new(endpoint);
    let mut tail = LogFileTail::new(&log_path);
    run_keep_alive(&mut state, timeout, |state| {
        for line in tail.poll()? {
            info!(target: "frpc", "{line}");
        }
        info!(
            elapsed_secs = state.elapsed().as_secs(),
            endpoint = state.public_endpoint.as_deref().unwrap_or("-"),
            "session alive"
        );
        Ok(())
    })
    .await?;

    if request.teardown {
        tunnel
            .shutdown()
            .await
            .context("failed to stop tunnel client")?;
    } else {
        info!(
            pid = tunnel.id(),
            "leaving tunnel client running until the job environment is torn down"
        );
    }
    info!("session complete");
    Ok(())
}

/// Fetch the account's public keys and install them for sshd. All failures
/// are warnings.
async fn authorize_keys(user: &str) {
    let fetched = match KeySource::new() {
        Ok(source) => source.fetch_lenient(user).await,
        Err(err) => {
            warn!(error = %err, "could not build key fetch client");
            return;
        }
    };
    if fetched.is_empty() {
        return;
    }
    match keys::default_authorized_keys_path() {
        Some(path) => {
            if let Err(err) = keys::install_authorized_keys(&fetched, &path) {
                warn!(error = %err, "failed to install authorized keys");
            }
        }
        None => warn!("could not determine home directory for authorized keys"),
    }
}
