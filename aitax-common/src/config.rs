//! TOML bootstrap configuration and config file location
//!
//! The bootstrap file is optional. Every field may be omitted; the widget
//! crate layers CLI arguments and environment variables on top of it and
//! falls back to built-in defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Identification backend endpoint
    #[serde(default)]
    pub api_url: Option<String>,

    /// API key passed to the backend as `api-key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Backend wire format (`pn`, `c4c`, `carp`)
    #[serde(default)]
    pub backend_format: Option<String>,

    /// Maximum number of images per identification
    #[serde(default)]
    pub max_images: Option<usize>,

    /// Language tag sent to the backend
    #[serde(default)]
    pub lang: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default configuration file path for the platform
///
/// `<config_dir>/aitax/config.toml`, e.g. `~/.config/aitax/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aitax").join("config.toml"))
}

/// Read and parse a TOML bootstrap file
///
/// # Errors
/// Returns `Error::Io` if the file cannot be read and `Error::Config` if it
/// is not valid TOML for [`TomlConfig`].
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))?;

    #[cfg(unix)]
    if config.api_key.is_some() && check_toml_permissions_loose(path).unwrap_or(false) {
        warn!(
            "{} contains an API key but is readable by other users (chmod 600 recommended)",
            path.display()
        );
    }

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Load the bootstrap file if it exists
///
/// An explicit path that does not exist is an error; a missing file at the
/// default location yields the default (empty) configuration.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::NotFound(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            load_toml_config(path)
        }
        None => match default_config_path() {
            Some(path) if path.exists() => load_toml_config(&path),
            _ => {
                debug!("No TOML config file found, using defaults");
                Ok(TomlConfig::default())
            }
        },
    }
}

/// Write configuration to a TOML file atomically
///
/// Serializes to `<path>.tmp` and renames over the target, creating parent
/// directories as needed. The file may hold an API key, so on Unix it is
/// restricted to the owner (0600).
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }
    std::fs::rename(&temp_path, path)?;

    debug!("Wrote TOML configuration to {}", path.display());
    Ok(())
}

/// Whether a config file is readable by group or others
#[cfg(unix)]
pub fn check_toml_permissions_loose(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o077 != 0)
}
