//! Server configuration
//!
//! Read once at startup from `KEYWARDEN_*` environment variables.

use chrono::Duration;
use keywarden_core::{default_threshold, DEFAULT_ACTIVITY_LIMIT, DEFAULT_STATUS_THRESHOLD_HOURS};
use std::env;
use thiserror::Error;
use tracing::Level;

pub const ENV_PORT: &str = "KEYWARDEN_PORT";
pub const ENV_LOG_LEVEL: &str = "KEYWARDEN_LOG_LEVEL";
pub const ENV_DATABASE_URL: &str = "KEYWARDEN_DATABASE_URL";
pub const ENV_STATUS_THRESHOLD_HOURS: &str = "KEYWARDEN_STATUS_THRESHOLD_HOURS";
pub const ENV_ACTIVITY_LIMIT: &str = "KEYWARDEN_ACTIVITY_LIMIT";

/// Configuration error
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Knobs for status derivation and the activity feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Hours a verification stays fresh when no device setting applies
    pub status_threshold_hours: i64,
    /// Feed length when the client does not pass `limit`
    pub activity_limit: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            status_threshold_hours: DEFAULT_STATUS_THRESHOLD_HOURS,
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
        }
    }
}

impl InventoryConfig {
    /// Out-of-range hours fall back to the default window
    pub fn status_threshold(&self) -> Duration {
        Duration::try_hours(self.status_threshold_hours).unwrap_or_else(default_threshold)
    }
}

/// Full server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub log_level: Level,
    /// Postgres connection string; in-memory storage when unset
    pub database_url: Option<String>,
    pub inventory: InventoryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: Level::INFO,
            database_url: None,
            inventory: InventoryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_PORT) {
            config.port = parse(ENV_PORT, &raw, "a port number")?;
        }
        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            config.log_level = parse(ENV_LOG_LEVEL, &raw, "a log level")?;
        }
        config.database_url = lookup(ENV_DATABASE_URL).filter(|url| !url.trim().is_empty());

        if let Some(raw) = lookup(ENV_STATUS_THRESHOLD_HOURS) {
            let hours: i64 = parse(ENV_STATUS_THRESHOLD_HOURS, &raw, "a positive number of hours")?;
            if hours <= 0 || Duration::try_hours(hours).is_none() {
                return Err(invalid(ENV_STATUS_THRESHOLD_HOURS, &raw, "a positive number of hours"));
            }
            config.inventory.status_threshold_hours = hours;
        }
        if let Some(raw) = lookup(ENV_ACTIVITY_LIMIT) {
            config.inventory.activity_limit = parse(ENV_ACTIVITY_LIMIT, &raw, "a non-negative integer")?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    raw: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid(name, raw, expected))
}

fn invalid(name: &'static str, raw: &str, expected: &'static str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: raw.to_string(),
        expected,
    }
}
