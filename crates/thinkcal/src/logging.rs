//! Process-wide logging setup.
//!
//! Library code logs through both `log` and `tracing`. `LogTracer` forwards
//! `log` records into the tracing subscriber so both end up in one stream.
//! The filter comes from `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::error::ThinkcalError;

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(format: LogFormat) -> Result<(), ThinkcalError> {
    tracing_log::LogTracer::init().map_err(|e| ThinkcalError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_names(true);

    let installed = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.map_err(|e| ThinkcalError::Logging(e.to_string()))
}
