//! Environment-driven process configuration.
//!
//! # Responsibility
//! - Resolve storage target and logging settings from `FEEDBACK_*` variables.
//!
//! # Invariants
//! - Unset or empty `FEEDBACK_DB_PATH` selects in-memory storage.
//! - Unset `FEEDBACK_LOG_DIR` selects stderr logging.
//! - Values are validated here so bootstrap code never sees a bad level or a
//!   relative log directory.

use crate::db::StorageTarget;
use crate::logging::{default_log_level, normalize_level, LogDestination};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "FEEDBACK_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "FEEDBACK_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "FEEDBACK_LOG_DIR";

/// Configuration error with the offending variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub var: &'static str,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid `{}`: {}", self.var, self.message)
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub storage: StorageTarget,
    pub log_level: &'static str,
    pub log_destination: LogDestination,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageTarget::InMemory,
            log_level: default_log_level(),
            log_destination: LogDestination::Stderr,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let storage = match read(DB_PATH_VAR) {
            Some(path) => StorageTarget::File(PathBuf::from(path.trim())),
            None => StorageTarget::InMemory,
        };

        let log_level = match read(LOG_LEVEL_VAR) {
            Some(level) => normalize_level(&level).map_err(|message| ConfigError {
                var: LOG_LEVEL_VAR,
                message,
            })?,
            None => default_log_level(),
        };

        let log_destination =
            LogDestination::from_dir(read(LOG_DIR_VAR).as_deref()).map_err(|message| {
                ConfigError {
                    var: LOG_DIR_VAR,
                    message,
                }
            })?;

        Ok(Self {
            storage,
            log_level,
            log_destination,
        })
    }
}
