// ABOUTME: Tracing subscriber setup: env filter, pretty or JSON console output, optional file sink
// ABOUTME: The returned guard keeps the non-blocking file writer flushing until dropped

use agentcord_core::config::{LogFormat, LoggingConfig};
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither RUST_LOG nor `[logging].filter` is set
pub const DEFAULT_FILTER: &str = "info,serenity=warn,tracing::span=warn";

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "agentcord.log";

/// Filter directives from config, falling back to the default
pub fn filter_directives(config: &LoggingConfig) -> &str {
    config
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FILTER)
}

/// Install the global subscriber. RUST_LOG overrides the configured filter.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(config)))
        .context("Invalid log filter")?;

    let (json, pretty) = match config.format {
        LogFormat::Json => (Some(fmt::layer().json().with_current_span(true)), None),
        LogFormat::Pretty => (None, Some(fmt::layer().with_target(true))),
    };

    let (file, guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {}", directory))?;
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        format = ?config.format,
        directory = ?config.directory,
        "Logging initialized"
    );
    Ok(guard)
}
