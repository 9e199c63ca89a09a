//! frp release provisioning: platform detection, archive download, extraction.
//!
//! Release archives follow frp's deterministic naming,
//! `frp_<version>_<os>_<arch>.<ext>`, and unpack into a directory of the same
//! stem containing the `frpc` client binary.

use std::path::PathBuf;

use thiserror::Error;

use crate::cmd::run_cmd;

/// Pinned frp release installed when the action does not ask for a specific
/// version.
pub const DEFAULT_FRP_VERSION: &str = "0.61.1";

const RELEASE_BASE_URL: &str = "https://github.com/fatedier/frp/releases/download";

/// Fatal provisioning errors; any of these aborts the run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download of {url} returned HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to extract archive: {0}")]
    Extract(anyhow::Error),

    #[error("archive did not contain the tunnel client at {0}")]
    MissingBinary(PathBuf),
}

/// Host platform in frp's release naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

impl Platform {
    /// Detect the host platform. Anything outside frp's release matrix is a
    /// fatal error.
    pub fn detect() -> Result<Self, ProvisionError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub(crate) fn from_parts(os: &str, arch: &str) -> Result<Self, ProvisionError> {
        let unsupported = || ProvisionError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };
        let os_kind = match os {
            "linux" => Os::Linux,
            "macos" => Os::Darwin,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" => Arch::Amd64,
            "aarch64" => Arch::Arm64,
            _ => return Err(unsupported()),
        };
        Ok(Self {
            os: os_kind,
            arch: arch_kind,
        })
    }

    /// Archive extension for this platform.
    pub const fn ext(&self) -> &'static str {
        match self.os {
            Os::Windows => "zip",
            _ => "tar.gz",
        }
    }

    /// Client binary file name inside the archive.
    pub const fn client_binary(&self) -> &'static str {
        match self.os {
            Os::Windows => "frpc.exe",
            _ => "frpc",
        }
    }

    /// Release asset name, e.g. `frp_0.61.1_linux_amd64.tar.gz`.
    pub fn asset_name(&self, version: &str) -> String {
        format!("frp_{version}_{}_{}.{}", self.os, self.arch, self.ext())
    }

    /// Directory the archive unpacks into.
    pub fn archive_dir(&self, version: &str) -> String {
        format!("frp_{version}_{}_{}", self.os, self.arch)
    }
}

/// Downloads and unpacks the frp release for the host platform.
#[derive(Debug)]
pub struct Provisioner {
    http: reqwest::Client,
    install_dir: PathBuf,
}

impl Provisioner {
    pub fn new(install_dir: PathBuf) -> Result<Self, ProvisionError> {
        // Ensure a TLS crypto provider is installed (reqwest uses
        // rustls-no-provider). The `Err` case just means it was already
        // installed — safe to ignore.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .user_agent(concat!("sidedoor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, install_dir })
    }

    /// Fetch and extract the given frp release, returning the path to the
    /// `frpc` binary. A binary left by an earlier run is reused as-is.
    pub async fn install(&self, version: &str) -> Result<PathBuf, ProvisionError> {
        let platform = Platform::detect()?;
        let client_path = self
            .install_dir
            .join(platform.archive_dir(version))
            .join(platform.client_binary());
        if client_path.exists() {
            tracing::info!(path = %client_path.display(), "tunnel client already installed");
            return Ok(client_path);
        }

        let asset = platform.asset_name(version);
        let url = format!("{RELEASE_BASE_URL}/v{version}/{asset}");
        tracing::info!(%url, "downloading tunnel client");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProvisionError::Download {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await?;

        let io_err = |path: &PathBuf| {
            let path = path.clone();
            move |source| ProvisionError::Io { path, source }
        };
        std::fs::create_dir_all(&self.install_dir).map_err(io_err(&self.install_dir))?;
        let archive_path = self.install_dir.join(&asset);
        std::fs::write(&archive_path, &bytes).map_err(io_err(&archive_path))?;

        extract(&archive_path, &self.install_dir, platform)?;

        if !client_path.exists() {
            return Err(ProvisionError::MissingBinary(client_path));
        }
        tracing::info!(path = %client_path.display(), "tunnel client installed");
        Ok(client_path)
    }
}

fn extract(
    archive: &std::path::Path,
    dest: &std::path::Path,
    platform: Platform,
) -> Result<(), ProvisionError> {
    let archive_str = archive.display().to_string();
    let dest_str = dest.display().to_string();
    let result = match platform.os {
        Os::Windows => run_cmd(
            "extracting frp archive",
            "unzip",
            &["-o", &archive_str, "-d", &dest_str],
        ),
        _ => run_cmd(
            "extracting frp archive",
            "tar",
            &["-xzf", &archive_str, "-C", &dest_str],
        ),
    };
    result.map_err(ProvisionError::Extract)
}
