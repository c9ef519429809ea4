//! Logging configuration and initialization
//!
//! Structured logging with tracing: compact console output, JSON for
//! log aggregation, and an optional log file.

use std::path::PathBuf;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "MODE_HOST_LOG";

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "MODE_HOST_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Write logs to `file_path` as well (default: false)
    pub file_enabled: bool,
    /// Log file location (default: `mode-host.log` in the working directory)
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Filter used when no environment filter is set (default: "info")
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
    /// Log file location, falling back to the working directory
    pub fn log_path(&self) -> PathBuf {
        self.file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("mode-host.log"))
    }
}

/// Logging setup failures
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot create log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Pick the output format from an explicit `MODE_HOST_LOG_FORMAT` value
fn json_requested(format_env: Option<&str>, config: &LogConfig) -> bool {
    format_env
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(config.json_format)
}

/// Initialize the logging system with the given configuration
///
/// Returns a guard that must be kept alive for the duration of the program
/// so file logging is flushed.
///
/// # Environment Variables
///
/// - `MODE_HOST_LOG`: log level filter (e.g. "debug", "info,mode_host::plugin=debug")
/// - `RUST_LOG`: used when `MODE_HOST_LOG` is unset
/// - `MODE_HOST_LOG_FORMAT`: set to "json" for JSON output
///
/// # Example
///
/// ```no_run
/// use mode_host::telemetry::{init_logging, LogConfig};
///
/// let _guard = init_logging(&LogConfig::default()).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    // MODE_HOST_LOG first, then RUST_LOG, then the config default
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let use_json = json_requested(std::env::var(LOG_FORMAT_ENV).ok().as_deref(), config);

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let mut file_guard: Option<WorkerGuard> = None;

    if config.file_enabled {
        let log_path = config.log_path();
        let file = std::fs::File::create(&log_path).map_err(|source| LoggingError::File {
            path: log_path.clone(),
            source,
        })?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        if config.console_enabled {
            let console_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact();
            subscriber.with(file_layer).with(console_layer).try_init()?;
        } else {
            subscriber.with(file_layer).try_init()?;
        }

        eprintln!("Logging to file: {}", log_path.display());
    } else if config.console_enabled {
        if use_json {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);
            subscriber.with(json_layer).try_init()?;
        } else {
            let console_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact();
            subscriber.with(console_layer).try_init()?;
        }
    } else {
        subscriber.try_init()?;
    }

    tracing::info!(
        target: "mode_host",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(file_guard)
}

// Re-export WorkerGuard so callers can store it
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.console_enabled);
        assert!(!config.file_enabled);
        assert!(!config.json_format);
        assert_eq!(config.default_level, "info");
        assert_eq!(config.log_path(), PathBuf::from("mode-host.log"));
    }

    #[test]
    fn test_json_format_selection() {
        let config = LogConfig::default();
        assert!(json_requested(Some("JSON"), &config));
        assert!(!json_requested(Some("text"), &config));
        assert!(!json_requested(None, &config));

        let config = LogConfig {
            json_format: true,
            ..LogConfig::default()
        };
        assert!(json_requested(None, &config));
        assert!(!json_requested(Some("compact"), &config));
    }

    #[test]
    fn test_unwritable_log_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            file_enabled: true,
            file_path: Some(dir.path().join("missing").join("host.log")),
            ..LogConfig::default()
        };

        match init_logging(&config) {
            Err(LoggingError::File { path, .. }) => assert!(path.ends_with("host.log")),
            other => panic!("expected file error, got {:?}", other.map(|g| g.is_some())),
        }
    }
}
