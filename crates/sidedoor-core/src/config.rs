//! Tunnel request model and frpc configuration resolution.
//!
//! Two configuration modes are supported: an operator-supplied full frpc
//! config (taken verbatim), or a generated single-proxy config built from a
//! port mapping. The generated proxy name carries the run id plus a random
//! suffix so concurrent jobs hitting the same relay cannot collide.

use std::path::Path;

use rand::RngExt;
use thiserror::Error;

/// Fatal configuration errors. The session never starts when one of these is
/// raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("frp_server is required when no explicit client config is given")]
    MissingServer,

    #[error("both local_port and remote_port are required when no explicit client config is given")]
    MissingPortMapping,

    #[error("invalid value for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

/// A validated tunnel session request. Immutable once built from the raw
/// action inputs (see [`crate::inputs::ActionInputs`]).
#[derive(Debug, Clone)]
pub struct TunnelRequest {
    /// Relay server host (e.g. "frp.example.com"). Empty only when an
    /// explicit client config is given.
    pub server_host: String,
    /// Relay server port.
    pub server_port: u16,
    /// Shared secret for the relay.
    pub auth_token: String,
    /// Full frpc configuration text, used verbatim when present.
    pub explicit_config: Option<String>,
    /// Local port to expose.
    pub local_port: Option<u16>,
    /// Remote port to claim on the relay.
    pub remote_port: Option<u16>,
    /// Address the local service listens on.
    pub local_address: String,
    /// Proxy protocol ("tcp" or "udp").
    pub protocol: String,
    /// Keep-alive budget in minutes.
    pub timeout_minutes: u64,
    /// frp release to provision.
    pub frp_version: String,
    /// Account whose public keys are authorized for remote login.
    pub ssh_user: Option<String>,
    /// CI run identifier, part of the generated proxy name.
    pub run_id: String,
    /// Kill the tunnel client once the keep-alive loop expires.
    pub teardown: bool,
}

impl TunnelRequest {
    /// The public endpoint of the tunnel, `host:remote_port`. Purely derived;
    /// `None` when either half is unknown (e.g. explicit-config mode).
    pub fn public_endpoint(&self) -> Option<String> {
        if self.server_host.is_empty() {
            return None;
        }
        self.remote_port
            .map(|port| format!("{}:{port}", self.server_host))
    }
}

/// The literal configuration text handed to the frpc binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    text: String,
}

impl ResolvedConfig {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Write the configuration to its well-known path.
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.text)
    }
}

/// Resolve a request into the frpc configuration text.
///
/// An explicit config wins and is returned unmodified; the operator assumes
/// full responsibility for its correctness. Otherwise both ports must be
/// present and a single-proxy TOML config is generated.
pub fn resolve_config(request: &TunnelRequest) -> Result<ResolvedConfig, ConfigError> {
    if let Some(explicit) = &request.explicit_config {
        return Ok(ResolvedConfig {
            text: explicit.clone(),
        });
    }

    let (Some(local_port), Some(remote_port)) = (request.local_port, request.remote_port) else {
        return Err(ConfigError::MissingPortMapping);
    };

    let proxy_name = format!("ssh-{}-{}", request.run_id, random_suffix(6));
    let text = format!(
        r#"serverAddr = "{server_host}"
serverPort = {server_port}

auth.method = "token"
auth.token = "{auth_token}"

[[proxies]]
name = "{proxy_name}"
type = "{protocol}"
localIP = "{local_address}"
localPort = {local_port}
remotePort = {remote_port}
"#,
        server_host = request.server_host,
        server_port = request.server_port,
        auth_token = request.auth_token,
        protocol = request.protocol,
        local_address = request.local_address,
    );

    Ok(ResolvedConfig { text })
}

/// Generate a random alphanumeric string of the given length.
fn random_suffix(len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TunnelRequest {
        TunnelRequest {
            server_host: "frp.example.com".into(),
            server_port: 7000,
            auth_token: "secret".into(),
            explicit_config: None,
            local_port: Some(22),
            remote_port: Some(10022),
            local_address: "127.0.0.1".into(),
            protocol: "tcp".into(),
            timeout_minutes: 15,
            frp_version: "0.61.1".into(),
            ssh_user: None,
            run_id: "12345".into(),
            teardown: false,
        }
    }

    #[test]
    fn missing_local_port_is_rejected() {
        let mut req = request();
        req.local_port = None;
        let err = resolve_config(&req).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPortMapping));
    }

    #[test]
    fn missing_remote_port_is_rejected() {
        let mut req = request();
        req.remote_port = None;
        let err = resolve_config(&req).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPortMapping));
    }

    #[test]
    fn explicit_config_is_returned_verbatim() {
        let mut req = request();
        req.explicit_config = Some("serverAddr = \"other.example.com\"\n".into());
        // Even with the port mapping missing, the explicit config wins.
        req.local_port = None;
        req.remote_port = None;
        let resolved = resolve_config(&req).unwrap();
        assert_eq!(resolved.text(), "serverAddr = \"other.example.com\"\n");
    }

    #[test]
    fn generated_config_contains_relay_and_proxy() {
        let resolved = resolve_config(&request()).unwrap();
        let text = resolved.text();
        assert!(text.contains("serverAddr = \"frp.example.com\""));
        assert!(text.contains("serverPort = 7000"));
        assert!(text.contains("auth.token = \"secret\""));
        assert!(text.contains("localPort = 22"));
        assert!(text.contains("remotePort = 10022"));
    }

    #[test]
    fn generated_config_is_valid_toml_with_one_proxy() {
        let resolved = resolve_config(&request()).unwrap();
        let value: toml::Value = toml::from_str(resolved.text()).unwrap();
        let proxies = value["proxies"].as_array().unwrap();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0]["type"].as_str(), Some("tcp"));
        assert_eq!(proxies[0]["localIP"].as_str(), Some("127.0.0.1"));
    }

    #[test]
    fn proxy_names_differ_across_invocations_with_same_run_id() {
        let req = request();
        let a = resolve_config(&req).unwrap();
        let b = resolve_config(&req).unwrap();
        let name = |cfg: &ResolvedConfig| {
            let value: toml::Value = toml::from_str(cfg.text()).unwrap();
            value["proxies"][0]["name"].as_str().unwrap().to_string()
        };
        let (name_a, name_b) = (name(&a), name(&b));
        assert!(name_a.starts_with("ssh-12345-"));
        assert!(name_b.starts_with("ssh-12345-"));
        assert_ne!(name_a, name_b);
    }

    #[test]
    fn public_endpoint_joins_host_and_remote_port() {
        assert_eq!(
            request().public_endpoint().as_deref(),
            Some("frp.example.com:10022")
        );
    }

    #[test]
    fn public_endpoint_empty_without_remote_port() {
        let mut req = request();
        req.remote_port = None;
        assert_eq!(req.public_endpoint(), None);
    }

    #[test]
    fn public_endpoint_empty_without_host() {
        let mut req = request();
        req.server_host = String::new();
        assert_eq!(req.public_endpoint(), None);
    }

    #[test]
    fn persist_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("frpc.toml");
        let resolved = resolve_config(&request()).unwrap();
        resolved.persist(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), resolved.text());
    }
}
