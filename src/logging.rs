//! Log subscriber setup.
//!
//! Logs go to stderr; stdout is reserved for the submitter's own report.
//! `RUST_LOG`, when set, wins over the configured level.

use crate::config::LoggingConfig;
use crate::error::{SubmitError, SubmitResult};
use tracing_subscriber::EnvFilter;

/// Build the level filter for `config`.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = tracing::Level::from(config.level);
        EnvFilter::new(level.as_str().to_lowercase())
    })
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> SubmitResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .with_target(config.include_targets)
        .with_ansi(config.colored && !config.json_format);

    let installed = if config.json_format {
        builder.json().try_init()
    } else if config.include_timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };

    installed.map_err(|e| SubmitError::config(format!("failed to install log subscriber: {e}")))
}
