//! Tracing subscriber setup for hosts embedding the pipeline.
//!
//! The library itself only emits through `tracing`; installing a subscriber
//! is left to the host. [`init_tracing`] is a convenience for binaries and
//! examples.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "SUBMITFLOW_LOG";

/// Default filter when [`LOG_ENV`] and `RUST_LOG` are unset.
pub const DEFAULT_FILTER: &str = "submitflow=info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown log format '{other}'"),
        }
    }
}

/// Builds the filter from `SUBMITFLOW_LOG`, then `RUST_LOG`, then the default.
pub fn env_filter() -> anyhow::Result<EnvFilter> {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    EnvFilter::try_new(&directives).with_context(|| format!("invalid log filter '{directives}'"))
}

/// Installs a global subscriber.
///
/// Fails if the filter does not parse or a subscriber is already set.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
    }
    .context("failed to install tracing subscriber")
}
