//! Logging configuration and initialization
//!
//! Provides structured logging with tracing, supporting console output,
//! file logging, and JSON format for log aggregation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "COMPOSER_LOG";

/// Environment variable selecting the output format ("json" or "compact")
pub const LOG_FORMAT_ENV: &str = "COMPOSER_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Enable file logging (default: false)
    pub file_enabled: bool,
    /// Path for the log file (default: `composer.log` in the working directory)
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Default log level filter (default: "info")
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_enabled: false,
            file_path: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Whether JSON output is selected, honoring `COMPOSER_LOG_FORMAT`
    pub fn use_json(&self) -> bool {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(self.json_format)
    }
}

/// Initialize the logging system with the given configuration
///
/// Returns a guard that must be kept alive for the duration of the program
/// so file logging is flushed.
///
/// # Environment Variables
///
/// - `COMPOSER_LOG`: log level filter (e.g. "debug", "info,layer_composer=trace")
/// - `RUST_LOG`: used when `COMPOSER_LOG` is not set
/// - `COMPOSER_LOG_FORMAT`: set to "json" for JSON output
///
/// # Example
///
/// ```no_run
/// use layer_composer::telemetry::{init_logging, LogConfig};
///
/// let _guard = init_logging(&LogConfig::default()).expect("Failed to initialize logging");
/// ```
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    // COMPOSER_LOG first, then RUST_LOG, then the configured default
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));
    let use_json = config.use_json();

    let mut file_guard: Option<WorkerGuard> = None;
    let mut log_path = None;
    let file_layer = if config.file_enabled {
        let path = config.file_path.clone().unwrap_or_else(|| PathBuf::from("composer.log"));
        let file = std::fs::File::create(&path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        file_guard = Some(guard);
        log_path = Some(path);

        Some(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                // No ANSI colors in file
                .with_ansi(false),
        )
    } else {
        None
    };

    let json_layer = (config.console_enabled && use_json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let console_layer = (config.console_enabled && !use_json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(json_layer)
        .with(console_layer)
        .try_init()?;

    if let Some(path) = &log_path {
        eprintln!("Logging to file: {}", path.display());
    }

    tracing::info!(
        target: "layer_composer",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(file_guard)
}

// Re-export WorkerGuard so callers can store it
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
