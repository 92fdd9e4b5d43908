//! Configuration
//!
//! Typed configuration with defaults, loaded from a JSON5 file under the
//! platform config directory (`<config>/ballotbot/config.json5`). A missing
//! file yields the defaults; a malformed file is an error.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Vote-session tuning
    pub vote: VoteConfig,

    /// Console channel settings (for the `start` subcommand)
    pub console: ConsoleConfig,
}

/// Vote-session tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoteConfig {
    /// Voting window in minutes for new sessions
    pub default_timeframe_mins: u32,

    /// Seconds between countdown ticks
    pub tick_interval_secs: u64,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            default_timeframe_mins: 3,
            tick_interval_secs: 60,
        }
    }
}

impl VoteConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "tickIntervalSecs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval between countdown ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

/// Identity the console loop runs under
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleConfig {
    /// Scope key console messages belong to
    pub scope: String,

    /// Username attached to console messages
    pub username: String,

    /// Whether the console user may run privileged commands
    pub privileged: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            scope: "console".to_string(),
            username: "operator".to_string(),
            privileged: true,
        }
    }
}

/// Resolved path of the configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ballotbot")
        .join("config.json5")
}

/// Load configuration from the default location.
pub fn load() -> Result<Config, ConfigError> {
    load_from(&config_path())
}

/// Load configuration from a specific file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = json5::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    config.vote.validate()?;
    Ok(config)
}
