//! Subscriber setup for the `strata` binary

use anyhow::Context;
use strata_core::{LogFormat, RunnerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable overriding the configured log filter
pub(crate) const LOG_ENV: &str = "STRATA_LOG";

/// Install the global subscriber; logs go to stderr so stdout stays parseable
pub(crate) fn init(config: &RunnerConfig) -> anyhow::Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(directives).with_context(|| format!("invalid {LOG_ENV}"))?,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("invalid log_level '{}'", config.log_level))?,
    };
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("failed to install tracing subscriber")
}
