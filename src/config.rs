use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::store::MergePolicy;
use crate::validation::InputValidator;

fn invalid(msg: impl Into<String>) -> anyhow::Error {
    SyncError::InvalidConfig(msg.into()).into()
}

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Polling and merge behaviour
    pub sync: SyncConfig,
    /// Scan memoization
    pub scanner: ScannerConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Polling and merge behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Background fetch period in milliseconds
    pub poll_interval_ms: u64,
    /// How diverging snapshots are applied
    pub merge_policy: MergePolicy,
}

/// Scan memoization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Maximum cached segment lists before the cache is cleared
    pub cache_capacity: usize,
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Directory for daily-rotated JSON log files
    pub file_path: Option<String>,
    /// "json" or "text" console output
    pub format: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            merge_policy: MergePolicy::Snapshot,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 2_048,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl SyncConfig {
    /// Background fetch period
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(&["config/default", "config/local", "conversation-sync"])
    }

    /// Load defaults, then each optional file in order, then `CONVO_SYNC__*` env vars
    pub fn load_from(files: &[&str]) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to build default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let app_config: Self = builder
            .add_source(
                Environment::with_prefix("CONVO_SYNC")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sync.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be greater than 0"));
        }
        InputValidator::validate_poll_interval(self.sync.poll_interval())
            .map_err(|e| invalid(format!("sync.poll_interval_ms: {e}")))?;

        if self.scanner.cache_capacity == 0 {
            return Err(invalid("cache_capacity must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(invalid(format!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format, valid_formats
            )));
        }

        Ok(())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}
