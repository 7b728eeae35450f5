//! Process configuration for the canvas core.
//!
//! # Responsibility
//! - Collect database, logging and connection settings in one value.
//! - Normalize and check settings assembled by an entry point.
//!
//! # Invariants
//! - `db_path = None` selects an in-memory database.
//! - After `validated`, `log_level` is one of `trace|debug|info|warn|error`
//!   and `log_dir`, when set, is absolute.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Busy timeout applied when none is configured.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Invalid configuration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        setting: &'static str,
        value: String,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                setting,
                value,
                message,
            } => write!(f, "invalid value `{value}` for {setting}: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Settings needed to bootstrap storage and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite database file. `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    /// Log level applied when file logging is enabled.
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl CoreConfig {
    /// Returns the configuration with its log level normalized.
    ///
    /// # Errors
    /// - Unknown log level names.
    /// - A relative log directory.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        let level = normalize_level(&self.log_level).map_err(|message| {
            ConfigError::InvalidValue {
                setting: "log_level",
                value: self.log_level.clone(),
                message,
            }
        })?;
        self.log_level = level.to_string();

        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    setting: "log_dir",
                    value: dir.display().to_string(),
                    message: "log directory must be absolute".to_string(),
                });
            }
        }

        Ok(self)
    }
}
