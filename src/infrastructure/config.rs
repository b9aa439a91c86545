//! Application configuration.
//!
//! Layers, later ones winning: built-in defaults, an optional configuration file (TOML, YAML or
//! JSON, picked by extension), then environment variables such as
//! `PIM_CLEANUP__RUN__MAX_CONSECUTIVE_HICCUPS=5`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::retry::RetryPolicy;

pub const ENV_PREFIX: &str = "PIM_CLEANUP";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub run: RunConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Traversal and hiccup tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Consecutive hiccups after which the run stops.
    pub max_consecutive_hiccups: u32,
    /// Rows per grid page (used by the in-memory grid).
    pub page_size: u32,
    pub call_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub hiccup_backoff_base_ms: u64,
    pub hiccup_backoff_max_ms: u64,
    pub hiccup_jitter_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_consecutive_hiccups: 10,
            page_size: 50,
            call_timeout_ms: 20_000,
            poll_interval_ms: 100,
            hiccup_backoff_base_ms: 1_000,
            hiccup_backoff_max_ms: 30_000,
            hiccup_jitter_ms: 250,
        }
    }
}

impl RunConfig {
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_consecutive_hiccups: self.max_consecutive_hiccups,
            backoff_base: Duration::from_millis(self.hiccup_backoff_base_ms),
            backoff_max: Duration::from_millis(self.hiccup_backoff_max_ms),
            jitter: Duration::from_millis(self.hiccup_jitter_ms),
        }
    }
}

/// Where the run artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub root_dir: PathBuf,
    pub reviewed_dir: String,
    pub corrected_dir: String,
    pub summary_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            reviewed_dir: "Reviewed Record Files".to_string(),
            corrected_dir: "Corrected Record Files".to_string(),
            summary_dir: "Activity Summary Files".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Directory of the log files, relative to the working directory unless absolute
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            log_dir: PathBuf::from("Log Files"),
        }
    }
}

impl AppConfig {
    /// Loads defaults, then `path` when given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let run = &self.run;
        let invalid = |message: &str| {
            Err(ConfigError::Validation {
                message: message.to_string(),
            })
        };

        if run.max_consecutive_hiccups == 0 {
            return invalid("max_consecutive_hiccups must be greater than 0");
        }
        if run.page_size == 0 {
            return invalid("page_size must be greater than 0");
        }
        if run.call_timeout_ms == 0 || run.poll_interval_ms == 0 {
            return invalid("call_timeout_ms and poll_interval_ms must be greater than 0");
        }
        if run.hiccup_backoff_base_ms > run.hiccup_backoff_max_ms {
            return invalid("hiccup_backoff_base_ms cannot be greater than hiccup_backoff_max_ms");
        }
        if !self.logging.console_output && !self.logging.file_output {
            return invalid("at least one of console_output and file_output must be enabled");
        }
        Ok(())
    }
}
