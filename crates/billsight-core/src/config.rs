//! Configuration loading
//!
//! Config is resolved in layers:
//! 1. An explicit path (`--config`)
//! 2. `$BILLSIGHT_CONFIG`
//! 3. `~/.config/billsight/config.toml` if it exists
//! 4. Embedded defaults (compiled into binary)
//!
//! Keys missing from a file keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::period::MonthStepping;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/billsight.toml");

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "BILLSIGHT_CONFIG";

/// Analytics tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub month_stepping: MonthStepping,
    /// Maximum vendors kept in a snapshot's top list
    pub top_vendor_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            month_stepping: MonthStepping::Approximate,
            top_vendor_limit: 5,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    pub server: ServerSettings,
}

impl Config {
    /// Load config following the layered lookup
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match resolve_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => Self::parse(DEFAULT_CONFIG),
        }
    }

    /// Load config from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::InvalidData(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::parse(&content)
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.analytics.top_vendor_limit == 0 {
            return Err(Error::Validation(
                "analytics.top_vendor_limit must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}

/// Default per-user config path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("billsight").join("config.toml"))
}

fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    default_config_path().filter(|p| p.exists())
}
