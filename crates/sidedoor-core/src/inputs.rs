//! Raw action inputs and the single parse/validate step.
//!
//! CI actions hand every input over as a string (unset inputs arrive as empty
//! strings). All coercion to numbers and all invariant checks happen here,
//! once, producing either a [`TunnelRequest`] or a fatal [`ConfigError`].

use crate::config::{ConfigError, TunnelRequest};

/// The string-typed configuration surface, exactly as received from the
/// invoking environment.
#[derive(Debug, Clone, Default)]
pub struct ActionInputs {
    pub frp_server: String,
    pub frp_server_port: String,
    pub frp_token: String,
    pub local_port: Option<String>,
    pub remote_port: Option<String>,
    pub local_address: String,
    pub protocol: String,
    pub frp_client_config: Option<String>,
    pub frp_version: String,
    pub timeout_minutes: String,
    pub ssh_user: Option<String>,
    pub run_id: String,
    pub teardown: String,
}

impl ActionInputs {
    /// Parse and validate into a typed request.
    ///
    /// Invariant: either an explicit client config is given, or both
    /// `local_port` and `remote_port` are present.
    pub fn into_request(self) -> Result<TunnelRequest, ConfigError> {
        let explicit_config = non_empty(self.frp_client_config);
        let local_port = parse_opt_port("local_port", self.local_port)?;
        let remote_port = parse_opt_port("remote_port", self.remote_port)?;

        if explicit_config.is_none() {
            if self.frp_server.is_empty() {
                return Err(ConfigError::MissingServer);
            }
            if local_port.is_none() || remote_port.is_none() {
                return Err(ConfigError::MissingPortMapping);
            }
        }

        Ok(TunnelRequest {
            server_host: self.frp_server,
            server_port: parse_port("frp_server_port", &self.frp_server_port)?,
            auth_token: self.frp_token,
            explicit_config,
            local_port,
            remote_port,
            local_address: default_if_empty(self.local_address, "127.0.0.1"),
            protocol: default_if_empty(self.protocol, "tcp"),
            timeout_minutes: parse_u64("timeout_minutes", &self.timeout_minutes)?,
            frp_version: default_if_empty(self.frp_version, crate::provision::DEFAULT_FRP_VERSION),
            ssh_user: non_empty(self.ssh_user),
            run_id: self.run_id,
            teardown: parse_flag(&self.teardown),
        })
    }
}

/// Treat an empty string as an unset input.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn default_if_empty(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn parse_port(field: &'static str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_opt_port(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<u16>, ConfigError> {
    non_empty(value).map(|v| parse_port(field, &v)).transpose()
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ActionInputs {
        ActionInputs {
            frp_server: "frp.example.com".into(),
            frp_server_port: "7000".into(),
            frp_token: "secret".into(),
            local_port: Some("22".into()),
            remote_port: Some("10022".into()),
            local_address: String::new(),
            protocol: String::new(),
            frp_client_config: None,
            frp_version: String::new(),
            timeout_minutes: "15".into(),
            ssh_user: Some("octocat".into()),
            run_id: "12345".into(),
            teardown: "false".into(),
        }
    }

    #[test]
    fn full_mapping_parses() {
        let req = inputs().into_request().unwrap();
        assert_eq!(req.server_host, "frp.example.com");
        assert_eq!(req.server_port, 7000);
        assert_eq!(req.local_port, Some(22));
        assert_eq!(req.remote_port, Some(10022));
        assert_eq!(req.local_address, "127.0.0.1");
        assert_eq!(req.protocol, "tcp");
        assert_eq!(req.timeout_minutes, 15);
        assert!(!req.teardown);
    }

    #[test]
    fn empty_port_string_counts_as_missing() {
        let mut raw = inputs();
        raw.remote_port = Some(String::new());
        let err = raw.into_request().unwrap_err();
        assert!(matches!(err, ConfigError::MissingPortMapping));
    }

    #[test]
    fn missing_server_without_explicit_config_is_fatal() {
        let mut raw = inputs();
        raw.frp_server = String::new();
        let err = raw.into_request().unwrap_err();
        assert!(matches!(err, ConfigError::MissingServer));
    }

    #[test]
    fn explicit_config_lifts_port_requirement() {
        let mut raw = inputs();
        raw.frp_server = String::new();
        raw.local_port = None;
        raw.remote_port = None;
        raw.frp_client_config = Some("serverAddr = \"x\"\n".into());
        let req = raw.into_request().unwrap();
        assert!(req.explicit_config.is_some());
        assert_eq!(req.public_endpoint(), None);
    }

    #[test]
    fn garbage_port_reports_the_field() {
        let mut raw = inputs();
        raw.local_port = Some("twenty-two".into());
        let err = raw.into_request().unwrap_err();
        match err {
            ConfigError::InvalidNumber { field, value } => {
                assert_eq!(field, "local_port");
                assert_eq!(value, "twenty-two");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_timeout_is_rejected() {
        let mut raw = inputs();
        raw.timeout_minutes = "soon".into();
        assert!(matches!(
            raw.into_request().unwrap_err(),
            ConfigError::InvalidNumber { field: "timeout_minutes", .. }
        ));
    }

    #[test]
    fn teardown_flag_accepts_common_spellings() {
        for spelling in ["true", "TRUE", "1", "yes"] {
            let mut raw = inputs();
            raw.teardown = spelling.into();
            assert!(raw.into_request().unwrap().teardown, "{spelling}");
        }
        let mut raw = inputs();
        raw.teardown = "no".into();
        assert!(!raw.into_request().unwrap().teardown);
    }

    #[test]
    fn defaults_fill_in_version_and_protocol() {
        let req = inputs().into_request().unwrap();
        assert_eq!(req.frp_version, crate::provision::DEFAULT_FRP_VERSION);
        assert_eq!(req.protocol, "tcp");
    }
}
