//! Credential source: public SSH keys for a source account.
//!
//! Keys come from the public `https://github.com/<user>.keys` endpoint. A 404
//! means the account has no keys published — zero credentials, not an error.
//! Every other failure is downgraded to a warning by [`KeySource::fetch_lenient`];
//! the session then proceeds without remote-login authorization installed.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_BASE_URL: &str = "https://github.com";

#[derive(Debug, Error)]
pub enum KeyFetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("key endpoint returned HTTP {status} for {user}")]
    Endpoint { status: u16, user: String },
}

/// Client for the public key endpoint.
#[derive(Debug)]
pub struct KeySource {
    http: reqwest::Client,
    base_url: String,
}

impl KeySource {
    pub fn new() -> Result<Self, KeyFetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point at a different endpoint; the session controller never does, but
    /// tests do.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, KeyFetchError> {
        // Ensure a TLS crypto provider is installed (reqwest uses
        // rustls-no-provider). The `Err` case just means it was already
        // installed — safe to ignore.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .user_agent(concat!("sidedoor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the account's public keys. HTTP 404 yields zero keys.
    pub async fn fetch(&self, user: &str) -> Result<Vec<String>, KeyFetchError> {
        let url = format!("{}/{user}.keys", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            warn!(user, "no public keys published for account");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(KeyFetchError::Endpoint {
                status: status.as_u16(),
                user: user.to_string(),
            });
        }
        Ok(parse_keys(&resp.text().await?))
    }

    /// Fetch, downgrading any failure to a warning plus zero keys. The
    /// credential source is a soft collaborator: it can degrade the session
    /// but never abort it.
    pub async fn fetch_lenient(&self, user: &str) -> Vec<String> {
        match self.fetch(user).await {
            Ok(keys) => {
                if keys.is_empty() {
                    warn!(user, "proceeding without remote-login authorization");
                } else {
                    info!(user, count = keys.len(), "fetched public keys");
                }
                keys
            }
            Err(err) => {
                warn!(user, error = %err, "key fetch failed, proceeding without remote-login authorization");
                Vec::new()
            }
        }
    }
}

/// One key per non-empty line, as served by the `.keys` endpoint.
fn parse_keys(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Default authorized-keys path for the current user.
pub fn default_authorized_keys_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("authorized_keys"))
}

/// Append keys to the authorized-keys file, creating it owner-read/write
/// only. A no-op for an empty key set.
pub fn install_authorized_keys(keys: &[String], path: &Path) -> std::io::Result<()> {
    if keys.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    for key in keys {
        writeln!(file, "{key}")?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    info!(count = keys.len(), path = %path.display(), "installed authorized keys");
    Ok(())
}
