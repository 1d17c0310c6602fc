//! Process-wide tracing subscriber.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber.
///
/// `-v` wins over `RUST_LOG`, which wins over `logging.level`.
///
/// # Errors
///
/// Invalid filter directive or a subscriber already installed.
pub fn init(cfg: &LoggingConfig, verbose: u8) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(filter_directive(cfg, verbose, rust_log.as_deref()))?;
    let registry = tracing_subscriber::registry().with(filter);

    match cfg.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .try_init()?,
    }
    Ok(())
}

fn filter_directive<'a>(cfg: &'a LoggingConfig, verbose: u8, rust_log: Option<&'a str>) -> &'a str {
    match rust_log {
        Some(directive) if verbose == 0 && !directive.trim().is_empty() => directive,
        _ => &cfg.level,
    }
}
