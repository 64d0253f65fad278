//! Prometheus metrics for the market data core.
//!
//! Recording is a no-op until [`init_metrics`] installs a recorder, so the
//! helpers are safe to call from tests and library code.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for historical fetch latency (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)),
            // 1ms to 30s
            latency_buckets: vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0],
        }
    }
}

impl MetricsConfig {
    /// Create a configuration listening on all interfaces at `port`.
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// Starts an HTTP listener exposing `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter cannot be configured or installed
/// (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %config.listen_addr, "Prometheus metrics exporter started");

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Ingestion Metrics
// ============================================================================

/// Record a tick accepted into a bar.
pub fn record_tick_ingested(symbol: &str) {
    counter!("ticks_ingested_total", "symbol" => symbol.to_string()).increment(1);
}

/// Record a tick that arrived after its slot closed and was dropped.
pub fn record_late_tick(symbol: &str) {
    counter!("late_ticks_total", "symbol" => symbol.to_string()).increment(1);
}

/// Record a tick outside the charted session.
pub fn record_out_of_session_tick(symbol: &str) {
    counter!("out_of_session_ticks_total", "symbol" => symbol.to_string()).increment(1);
}

/// Record a bar closed and stored in a chart.
pub fn record_bar_closed(symbol: &str) {
    counter!("bars_closed_total", "symbol" => symbol.to_string()).increment(1);
}

/// Record a tick record that failed to decode.
///
/// # Arguments
///
/// * `reason` - Stable error code (e.g., `"MISSING_SYMBOL"`)
pub fn record_decode_failure(reason: &str) {
    counter!("tick_decode_failures_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Split Ledger Metrics
// ============================================================================

/// Record two different ratios observed for the same split.
pub fn record_split_conflict(symbol: &str) {
    counter!("split_conflicts_total", "symbol" => symbol.to_string()).increment(1);
}

// ============================================================================
// Historical Source Metrics
// ============================================================================

/// Record one attempt against a historical source.
///
/// # Arguments
///
/// * `source` - Source name
/// * `operation` - Operation (e.g., `"minute_bars"`)
/// * `latency_seconds` - Attempt duration in seconds
pub fn record_historical_attempt(source: &str, operation: &str, latency_seconds: f64) {
    counter!(
        "historical_fetch_attempts_total",
        "source" => source.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);

    histogram!(
        "historical_fetch_latency_seconds",
        "source" => source.to_string(),
        "operation" => operation.to_string()
    )
    .record(latency_seconds);
}

/// Record a failed attempt against a historical source.
///
/// # Arguments
///
/// * `source` - Source name
/// * `operation` - Operation
/// * `reason` - Stable error code (e.g., `"TIMEOUT"`)
pub fn record_historical_failure(source: &str, operation: &str, reason: &str) {
    counter!(
        "historical_fetch_failures_total",
        "source" => source.to_string(),
        "operation" => operation.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(!config.latency_buckets.is_empty());
    }

    #[test]
    fn test_config_with_port() {
        let config = MetricsConfig::with_port(9464);
        assert_eq!(config.listen_addr.port(), 9464);
    }

    #[test]
    fn test_latency_buckets_are_sorted() {
        let config = MetricsConfig::default();
        assert!(config.latency_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_recording_without_recorder() {
        // Actual metric recording requires an installed recorder
        record_tick_ingested("AAPL");
        record_late_tick("AAPL");
        record_out_of_session_tick("AAPL");
        record_bar_closed("AAPL");
        record_decode_failure("MISSING_SYMBOL");
        record_split_conflict("AAPL");
        record_historical_attempt("memory", "minute_bars", 0.002);
        record_historical_failure("memory", "minute_bars", "TIMEOUT");
    }
}
