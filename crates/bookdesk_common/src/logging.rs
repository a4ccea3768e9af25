//! Logging utilities for Bookdesk.
//!
//! Every binary and test calls into this module instead of building its own
//! subscriber, so filters and formatting stay consistent across crates.

use bookdesk_config::LoggingConfig;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at INFO.
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` directives still apply; `level` becomes the default for the
/// `bookdesk` crates. Safe to call more than once.
pub fn init_with_level(level: Level) {
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(build_filter(&level.to_string()))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize logging from configuration.
///
/// When `directory` is set a daily rolling file is written next to stdout.
/// The returned guard flushes the file writer and must be held by `main`.
pub fn init_from_config(config: &LoggingConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match config.directory.as_deref() {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "bookdesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(file_layer)
        .with(build_filter(&config.level))
        .try_init();

    if result.is_ok() {
        info!(
            "Logging initialized at level: {} (file output: {})",
            config.level,
            config.directory.as_deref().unwrap_or("disabled")
        );
    }
    guard
}

fn build_filter(level: &str) -> EnvFilter {
    let default_directive = format!("bookdesk={level}");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match default_directive.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Log an error with context at the ERROR level.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    tracing::error!("{}: {}", context, error);
}
