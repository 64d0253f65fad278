//! Configuration loading for the market data service.
//!
//! YAML with `${VAR}` / `${VAR:-default}` interpolation, validated after
//! parsing. Every section is optional.
//!
//! ```rust,ignore
//! use market_data::config::load_config;
//!
//! let config = load_config(Some("config.yaml"))?;
//! let window = config.session.window();
//! ```

mod dictionary;
mod history;
mod ingest;
mod observability;
mod session;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dictionary::DictionaryConfig;
pub use history::HistoryConfig;
pub use ingest::{IngestConfig, SplitsConfig};
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use session::SessionConfig;

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "MARKET_DATA_CONFIG";

const LOG_FORMATS: [&str; 3] = ["json", "pretty", "compact"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Charted session.
    #[serde(default)]
    pub session: SessionConfig,

    /// Symbol dictionary.
    #[serde(default)]
    pub dictionary: DictionaryConfig,

    /// Tick ingestion.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Split ledger.
    #[serde(default)]
    pub splits: SplitsConfig,

    /// Historical source retries.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Resolve the config path: explicit argument, then `MARKET_DATA_CONFIG`,
/// then `config.yaml`.
#[must_use]
pub fn resolve_config_path(path: Option<&str>) -> String {
    path.map(str::to_string)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().filter(|p| !p.is_empty()))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = resolve_config_path(path);

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Replace `${VAR}` and `${VAR:-default}`. Unset or empty variables without
/// a default become empty.
#[allow(clippy::expect_used)] // Constant pattern.
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = cap.get(1).map_or("", |m| m.as_str());
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let session = &config.session;
    if session.granularity_ms <= 0 {
        return Err(ConfigError::ValidationError(
            "session.granularity_ms must be positive".to_string(),
        ));
    }

    let window = session.window();
    let span = i64::from(window.end.millis()) - i64::from(window.start.millis());
    if span < i64::from(session.granularity_ms) {
        return Err(ConfigError::ValidationError(format!(
            "session {}..{} is shorter than one {}ms bar",
            session.start, session.end, session.granularity_ms
        )));
    }

    session.utc_offset()?;
    config.dictionary.build()?;

    if config.ingest.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "ingest.channel_capacity must be positive".to_string(),
        ));
    }

    let history = &config.history;
    if history.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "history.timeout_ms must be positive".to_string(),
        ));
    }
    if history.initial_backoff_ms > history.max_backoff_ms {
        return Err(ConfigError::ValidationError(
            "history.initial_backoff_ms must not exceed history.max_backoff_ms".to_string(),
        ));
    }

    let format = config.observability.logging.format.as_str();
    if !LOG_FORMATS.contains(&format) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {LOG_FORMATS:?}"
        )));
    }

    Ok(())
}
