// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::cast_possible_wrap,
        clippy::needless_collect,
        clippy::items_after_statements
    )
)]

//! Market Data - Rust Core Library
//!
//! Tick codec, bar aggregation, symbol charts and the stock split ledger.
//!
//! # Layout
//!
//! - `domain`: timestamps, symbol codes, prices and trade ticks
//! - `codec`: the fixed-width big-endian tick record
//! - `bars`: closed [`Bar`]s and the in-progress [`CumulativeBar`]
//! - `chart`: [`SymbolChart`], one slot per time bucket of a session
//! - `ingest`: per-symbol writer tasks turning records into charts
//! - `splits`: the [`SplitLedger`] and share count correction
//! - `historical`: historical bar sources with timeout and retry
//! - `config`, `telemetry`, `observability`: YAML config, tracing, Prometheus
//!
//! # Data flow
//!
//! ```text
//! bytes -> TickRecord -> Tick -> IngestService -> SymbolChart<CumulativeBar>
//!                                                        |
//!                                    HistoricalFetcher -> SymbolChart<Bar>
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod bars;
pub mod chart;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod historical;
pub mod ingest;
pub mod observability;
pub mod splits;
pub mod telemetry;

pub use bars::{Bar, BarField, BarState, CumulativeBar, OhlcvBar};
pub use chart::SymbolChart;
pub use codec::{TickRecord, TickRecordCodec};
pub use domain::{
    InMemorySymbolDictionary, InternalClock, InternalTimestamp, SymbolCode, SymbolDictionary, Tick,
};
pub use error::{ErrorCode, MarketDataError, Result};
pub use historical::{HistoricalDataSource, HistoricalFetcher, InMemoryHistoricalSource};
pub use ingest::{IngestService, SessionWindow, SymbolIngestor};
pub use splits::{SplitEvent, SplitLedger};
