//! Configuration module for calsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for calsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub google: GoogleConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between orchestrator passes.
    pub poll_interval: u64,
    /// Half-width of the full-sync window in days: a workspace with no
    /// cursor fetches events from `now - window_days` to `now + window_days`.
    pub window_days: i64,
    /// Page size requested from the calendar API.
    pub max_results: u32,
    /// Fallback IANA timezone for all-day events whose calendar does not
    /// carry its own zone.
    pub default_timezone: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: 300,
            window_days: 90,
            max_results: 250,
            default_timezone: "UTC".to_string(),
        }
    }
}

/// Google Calendar API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Calendar API base URL. Overridable for tests.
    pub api_base_url: String,
    /// OAuth token endpoint used for access-token refresh.
    pub token_url: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Maximum attempts per request, including the first.
    pub max_retries: u32,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            max_retries: 5,
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("calsync")
                .join("calsync.db"),
        }
    }
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/calsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("calsync")
            .join("config.yaml")
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.window_days <= 0 {
            errors.push(ValidationError {
                field: "sync.window_days".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.max_results == 0 || self.sync.max_results > 2500 {
            errors.push(ValidationError {
                field: "sync.max_results".into(),
                message: "must be between 1 and 2500".into(),
            });
        }
        if self.sync.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(ValidationError {
                field: "sync.default_timezone".into(),
                message: format!("unknown timezone: {}", self.sync.default_timezone),
            });
        }

        if self.google.api_base_url.is_empty() {
            errors.push(ValidationError {
                field: "google.api_base_url".into(),
                message: "must not be empty".into(),
            });
        }
        if self.google.token_url.is_empty() {
            errors.push(ValidationError {
                field: "google.token_url".into(),
                message: "must not be empty".into(),
            });
        }
        if self.google.max_retries == 0 {
            errors.push(ValidationError {
                field: "google.max_retries".into(),
                message: "must be greater than 0".into(),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of {:?}",
                    self.logging.level, VALID_LOG_LEVELS
                ),
            });
        }

        errors
    }
}
