//! Process configuration loaded from environment variables.
//!
//! # Responsibility
//! - Resolve database location, credential and logging settings.
//! - Keep lookup injectable so tests never mutate the process environment.
//!
//! # Invariants
//! - Blank values are treated as unset.
//! - `log_dir`, when set, must be absolute (the logging layer requires it).

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "HANDBOOK_DB_PATH";
pub const ENV_API_KEY: &str = "HANDBOOK_API_KEY";
pub const ENV_LOG_LEVEL: &str = "HANDBOOK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HANDBOOK_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "handbook.sqlite3";

/// Configuration loading failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    Missing(&'static str),
    /// A variable is set but unusable.
    Invalid { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "required setting `{key}` is not set"),
            Self::Invalid { key, message } => write!(f, "invalid setting `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved directory settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub db_path: PathBuf,
    /// Static credential for the API key gate.
    pub api_key: Option<String>,
    pub log_level: String,
    /// Rolling log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl DirectoryConfig {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(dir) = &log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    key: ENV_LOG_DIR,
                    message: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }

        Ok(Self {
            db_path: read(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME)),
            api_key: read(ENV_API_KEY),
            log_level: read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir,
        })
    }

    /// Returns the configured credential or fails when it is missing.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_API_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DirectoryConfig, ENV_API_KEY, ENV_DB_PATH, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = DirectoryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("handbook.sqlite3"));
        assert_eq!(config.api_key, None);
        assert!(config.log_dir.is_none());
        assert_eq!(
            config.require_api_key().unwrap_err(),
            ConfigError::Missing(ENV_API_KEY)
        );
    }

    #[test]
    fn values_are_trimmed_and_blank_means_unset() {
        let config = DirectoryConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, " /var/lib/handbook.db "),
            (ENV_API_KEY, "   "),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/handbook.db"));
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = DirectoryConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "logs")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_LOG_DIR));
    }
}
