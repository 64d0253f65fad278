//! Observability for the market data core.
//!
//! Prometheus metrics export and the recording helpers used by ingestion,
//! the split ledger and the historical fetcher.

mod metrics;

pub use self::metrics::{
    MetricsConfig, MetricsError, init_metrics, record_bar_closed, record_decode_failure,
    record_historical_attempt, record_historical_failure, record_late_tick,
    record_out_of_session_tick, record_split_conflict, record_tick_ingested,
};
