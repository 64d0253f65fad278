//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the configured level.
//!
//! ```rust,ignore
//! use market_data::telemetry::init_tracing;
//!
//! init_tracing(&config.observability.logging)?;
//! ```

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The level or filter directive is invalid.
    #[error("invalid log filter '{directive}': {reason}")]
    Filter {
        /// The rejected directive.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Build the filter from `RUST_LOG`, falling back to `level`.
///
/// # Errors
///
/// Returns `TelemetryError::Filter` if `level` is not a valid directive.
pub fn env_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| TelemetryError::Filter {
        directive: level.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber in the configured format.
///
/// # Errors
///
/// Returns `TelemetryError` on a bad filter or when a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format.as_str() {
        "pretty" => registry.with(fmt::layer().pretty()).try_init(),
        "compact" => registry.with(fmt::layer().compact()).try_init(),
        _ => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))?;

    tracing::info!(
        level = %config.level,
        format = %config.format,
        "tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_rejected() {
        // RUST_LOG would bypass the configured level.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let Err(err) = env_filter("market_data=verbose") else {
            panic!("malformed directive should be rejected");
        };
        assert!(matches!(err, TelemetryError::Filter { .. }));
    }

    #[test]
    fn configured_level_builds_filter() {
        assert!(env_filter("info").is_ok());
        assert!(env_filter("market_data=debug,warn").is_ok());
    }
}
