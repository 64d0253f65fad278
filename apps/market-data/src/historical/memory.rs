//! In-memory historical source backed by stored ticks and split events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{HistoricalDataSource, MINUTE_MS, SECOND_MS};
use crate::bars::{Bar, CumulativeBar};
use crate::chart::SymbolChart;
use crate::domain::{InternalTimestamp, Tick};
use crate::error::{MarketDataError, Result};
use crate::ingest::{SessionWindow, SymbolIngestor};
use crate::splits::{SplitEvent, SplitLedger};

/// Serves bars aggregated on demand from stored ticks.
///
/// Failures can be injected with [`Self::fail_next`] and latency with
/// [`Self::with_latency`].
#[derive(Debug, Default)]
pub struct InMemoryHistoricalSource {
    name: String,
    ticks: RwLock<HashMap<String, Vec<Tick>>>,
    splits: RwLock<HashMap<String, Vec<SplitEvent>>>,
    pending_failures: AtomicU32,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemoryHistoricalSource {
    /// Create an empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store a tick; its symbol becomes known.
    pub fn add_tick(&self, tick: Tick) {
        self.ticks
            .write()
            .entry(tick.symbol.clone())
            .or_default()
            .push(tick);
    }

    /// Store a split event; its symbol becomes known.
    pub fn add_split(&self, event: SplitEvent) {
        self.splits
            .write()
            .entry(event.symbol.clone())
            .or_default()
            .push(event);
    }

    /// Fail the next `count` calls with `Unavailable`.
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin_call(&self, operation: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(MarketDataError::Unavailable(format!(
                "{}: injected failure in {operation}",
                self.name
            )));
        }
        Ok(())
    }

    fn is_known(&self, symbol: &str) -> bool {
        self.ticks.read().contains_key(symbol) || self.splits.read().contains_key(symbol)
    }

    fn build_chart(
        &self,
        symbol: &str,
        from: InternalTimestamp,
        to: InternalTimestamp,
        granularity_ms: i32,
    ) -> Result<SymbolChart<Bar>> {
        if !self.is_known(symbol) {
            return Err(MarketDataError::missing_symbol(
                symbol,
                format!("no historical data in {}", self.name),
            ));
        }

        let mut ticks = self.ticks.read().get(symbol).cloned().unwrap_or_default();
        ticks.sort_by_key(|tick| tick.transaction_timestamp);

        let window = SessionWindow::new(from, to, granularity_ms);
        let mut ingestor = SymbolIngestor::new(symbol, window)?;
        for tick in &ticks {
            ingestor.ingest(tick)?;
        }
        let chart = ingestor.finish()?;
        debug!(
            symbol,
            bars = chart.non_null_count(),
            granularity_ms,
            "historical chart built"
        );
        Ok(chart.map(CumulativeBar::to_bar))
    }
}

#[async_trait]
impl HistoricalDataSource for InMemoryHistoricalSource {
    async fn minute_bars(
        &self,
        symbol: &str,
        from: InternalTimestamp,
        to: InternalTimestamp,
    ) -> Result<SymbolChart<Bar>> {
        self.begin_call("minute_bars").await?;
        self.build_chart(symbol, from, to, MINUTE_MS)
    }

    async fn second_bars(
        &self,
        symbol: &str,
        from: InternalTimestamp,
        to: InternalTimestamp,
    ) -> Result<SymbolChart<Bar>> {
        self.begin_call("second_bars").await?;
        self.build_chart(symbol, from, to, SECOND_MS)
    }

    async fn update_splits_for(&self, symbol: &str, ledger: &SplitLedger) -> Result<usize> {
        self.begin_call("update_splits_for").await?;
        if !self.is_known(symbol) {
            return Err(MarketDataError::missing_symbol(
                symbol,
                format!("no split data in {}", self.name),
            ));
        }

        let events = self.splits.read().get(symbol).cloned().unwrap_or_default();
        let offered = events.len();
        for event in events {
            ledger.add(event);
        }
        Ok(offered)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
