//! Logging setup for the protocol engine
//!
//! The engine is embedded under a GUI, so the default is silence: nothing
//! may contaminate stdout/stderr unless the host application asks for it.
//! Protocol-level logging (the wire traffic toggle surfaced in the GUI) is
//! ordinary `tracing` output under the `avr` targets and is enabled by
//! picking a non-silent mode.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different host environments
#[derive(Debug, Clone, Copy)]
pub enum LoggingMode {
    /// No output, the default for GUI hosts
    Silent,
    /// Compact stderr output for development
    Development,
    /// Verbose diagnostics with source locations
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Initialize logging with the specified mode.
///
/// Call once, before opening any connection.
///
/// # Environment Variables
///
/// - `AVR_LOG_LEVEL`: override log level (error, warn, info, debug, trace)
/// - `RUST_LOG`: standard filter syntax, consulted after `AVR_LOG_LEVEL`
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = env_filter("info");

            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(filter);

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))?;

            Ok(())
        }
        LoggingMode::Debug => {
            let filter = env_filter("debug");

            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter);

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))?;

            Ok(())
        }
    }
}

/// Initialize logging from the `AVR_LOG_MODE` environment variable:
/// "development", "debug", or anything else for silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var("AVR_LOG_MODE").as_deref() {
        Ok("development") => LoggingMode::Development,
        Ok("debug") => LoggingMode::Debug,
        _ => LoggingMode::Silent,
    };

    init_logging(mode)
}

fn env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("AVR_LOG_LEVEL") {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

/// Whether a global subscriber has already been installed.
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
