//! Configuration, loaded from TOML.
//!
//! The network section decides whether the control server may start at all,
//! where it binds, and the optional static bearer token for the HTTP
//! pipeline. The per-session credential is NOT configured here — it is
//! minted at start and only ever lives in memory.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Network server section.
    #[serde(default)]
    pub network: NetworkServerConfig,
}

/// Settings for the HTTP control endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkServerConfig {
    /// Whether the control server may be started.
    #[serde(default)]
    pub enabled: bool,
    /// Host address to bind and to advertise in the pairing payload.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind. Port 0 binds an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Static bearer token for the HTTP pipeline. When unset, only the
    /// per-session credential gate applies.
    pub auth_token: Option<String>,
    /// Origins allowed to call the API from browsers.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Per-IP request rate limit (requests per second).
    pub rate_limit: Option<u32>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for NetworkServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
            auth_token: None,
            cors_origins: Vec::new(),
            rate_limit: None,
        }
    }
}

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ControlConfig {
    /// Load config from a TOML file. Returns `Ok(None)` if the file does
    /// not exist. Warns if the file is world-readable, since it may carry
    /// the static bearer token.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        check_config_permissions(path);

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// Save config to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Warn if a config file is world-readable; it may contain the bearer token.
#[cfg(unix)]
pub fn check_config_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = std::fs::metadata(path) else {
        return;
    };

    let mode = metadata.permissions().mode();
    if is_world_readable(mode) {
        tracing::warn!(
            "config file {} is world-readable (mode {:o}); it may contain an auth token, \
             consider chmod 600",
            path.display(),
            mode & 0o7777,
        );
    }
}

/// No-op on non-Unix platforms.
#[cfg(not(unix))]
pub fn check_config_permissions(_path: &Path) {}

/// Whether a file mode has the world-readable bit set. Pure helper; does
/// not touch the filesystem.
#[cfg(unix)]
pub fn is_world_readable(mode: u32) -> bool {
    mode & 0o004 != 0
}
