use crate::config::LoggingConfig;
use crate::error::{Result, ScraperError};
use std::fs;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging plus an optional daily-rotated JSON log file.
///
/// Keep the returned guard alive for as long as file logs should be flushed.
/// If a global subscriber is already installed nothing changes and `None` is
/// returned, since no file layer was attached.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let (subscriber, guard) = build_subscriber(config)?;

    if subscriber.try_init().is_err() {
        tracing::debug!("Logging already initialized; keeping existing subscriber");
        return Ok(None);
    }

    Ok(guard)
}

fn build_subscriber(
    config: &LoggingConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>)> {
    // Respect RUST_LOG if set; otherwise use the configured directive
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| {
            ScraperError::Config(format!("Invalid log filter '{}': {}", config.filter, e))
        })?,
    };

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout);

    let (file_layer, guard) = match &config.json_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "card_scraper.log");
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().json().with_writer(non_blocking_writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer);

    Ok((subscriber, guard))
}
