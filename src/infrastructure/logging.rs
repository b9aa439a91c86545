//! Logging system initialization
//!
//! - One log file per run, `pim_data_cleanup_<MM.DD.YYYY_HH.MM.SS>.log`, in the configured
//!   log directory
//! - Plain or JSON formatting
//! - Console and file output can be enabled separately
//! - `RUST_LOG` overrides the configured level

use anyhow::{Result, anyhow};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

/// Timestamp layout shared by log files and run artifacts.
pub const FILE_TIMESTAMP_FORMAT: &str = "%m.%d.%Y_%H.%M.%S";

// Keeps the non-blocking file writer alive for the whole process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

/// Local wall-clock time, matching the timestamps in file names.
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// File name of the log for a run started now.
#[must_use]
pub fn log_file_name() -> String {
    format!(
        "pim_data_cleanup_{}.log",
        Local::now().format(FILE_TIMESTAMP_FORMAT)
    )
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(format!("{},config=warn", config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

fn file_layer(config: &LoggingConfig) -> Result<(BoxedLayer, PathBuf)> {
    std::fs::create_dir_all(&config.log_dir).map_err(|e| {
        anyhow!(
            "Failed to create log directory {}: {}",
            config.log_dir.display(),
            e
        )
    })?;

    let file_name = log_file_name();
    let (writer, guard) = non_blocking(rolling::never(&config.log_dir, &file_name));
    LOG_GUARDS
        .lock()
        .map_err(|_| anyhow!("log guard registry poisoned"))?
        .push(guard);

    let layer = if config.json_format {
        fmt::Layer::new()
            .json()
            .with_writer(writer)
            .with_timer(LocalTimeFormatter)
            .with_target(true)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::Layer::new()
            .with_writer(writer)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
            .with_ansi(false)
            .boxed()
    };
    Ok((layer, config.log_dir.join(file_name)))
}

fn console_layer() -> BoxedLayer {
    fmt::Layer::new()
        .with_writer(std::io::stdout)
        .with_timer(LocalTimeFormatter)
        .with_target(false)
        .boxed()
}

/// Installs the global subscriber. Fails when no output is enabled or a subscriber already exists.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut log_path = None;
    if config.file_output {
        let (layer, path) = file_layer(config)?;
        layers.push(layer);
        log_path = Some(path);
    }
    if config.console_output {
        layers.push(console_layer());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!(level = %config.level, json = config.json_format, "Logging system initialized");
    if let Some(path) = log_path {
        info!("Log file: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_name_carries_timestamp() {
        let name = log_file_name();
        assert!(name.starts_with("pim_data_cleanup_"));
        assert!(name.ends_with(".log"));
        // pim_data_cleanup_ + MM.DD.YYYY_HH.MM.SS + .log
        assert_eq!(name.len(), "pim_data_cleanup_".len() + 19 + ".log".len());
    }

    #[test]
    fn no_output_is_rejected() {
        let config = LoggingConfig {
            console_output: false,
            file_output: false,
            ..LoggingConfig::default()
        };
        assert!(init_logging(&config).is_err());
    }
}
