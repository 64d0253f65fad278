//! Historical bar and split retrieval.
//!
//! [`HistoricalDataSource`] is the port a vendor adapter implements.
//! [`HistoricalFetcher`] wraps any source with a per-attempt timeout and a
//! bounded retry loop with exponential backoff.

mod fetcher;
mod memory;

pub use fetcher::{BackoffCalculator, FetchPolicy, HistoricalFetcher};
pub use memory::InMemoryHistoricalSource;

use async_trait::async_trait;

use crate::bars::Bar;
use crate::chart::SymbolChart;
use crate::domain::InternalTimestamp;
use crate::error::Result;
use crate::splits::SplitLedger;

/// Slot width of minute charts.
pub const MINUTE_MS: i32 = 60_000;

/// Slot width of second charts.
pub const SECOND_MS: i32 = 1_000;

/// A source of historical bars and split events.
///
/// Ranges are internal timestamps within one trading day.
#[async_trait]
pub trait HistoricalDataSource: Send + Sync {
    /// One-minute bars for `[from, to)`.
    ///
    /// # Errors
    ///
    /// `MissingSymbol` for an unknown symbol, `InvalidArgument` for an empty
    /// range, `Unavailable` for transient upstream failures.
    async fn minute_bars(
        &self,
        symbol: &str,
        from: InternalTimestamp,
        to: InternalTimestamp,
    ) -> Result<SymbolChart<Bar>>;

    /// One-second bars for `[from, to)`.
    ///
    /// # Errors
    ///
    /// As [`Self::minute_bars`].
    async fn second_bars(
        &self,
        symbol: &str,
        from: InternalTimestamp,
        to: InternalTimestamp,
    ) -> Result<SymbolChart<Bar>>;

    /// Add the symbol's known splits to `ledger`; returns how many were offered.
    ///
    /// # Errors
    ///
    /// `MissingSymbol` for an unknown symbol, `Unavailable` for transient
    /// upstream failures.
    async fn update_splits_for(&self, symbol: &str, ledger: &SplitLedger) -> Result<usize>;

    /// Source name for logs and metrics.
    fn name(&self) -> &str;
}
