//! Infrastructure layer for configuration, logging, persistence and record sources
//!
//! Retry and wait primitives shared by every collaborator call also live here.

pub mod config;
pub mod grid_fixture;
pub mod logging;
pub mod paging_banner;
pub mod persistence;
pub mod retry;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError};
pub use grid_fixture::{GridRecord, InMemoryGrid};
pub use logging::init_logging;
pub use persistence::{CsvResultSink, ResultSink};
pub use retry::RetryPolicy;
