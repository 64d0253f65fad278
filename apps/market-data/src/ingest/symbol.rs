//! Single-writer bar aggregation for one symbol.

use tracing::{debug, trace, warn};

use super::SessionWindow;
use crate::bars::{BarState, CumulativeBar};
use crate::chart::SymbolChart;
use crate::domain::{Tick, price_to_cents};
use crate::error::{MarketDataError, Result};
use crate::observability::{
    record_bar_closed, record_late_tick, record_out_of_session_tick, record_tick_ingested,
};

/// What happened to an ingested tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Added to the active bar.
    Accepted,
    /// Belongs to a slot that already closed; dropped.
    Late,
    /// Outside the charted session; dropped.
    OutOfSession,
}

/// Aggregates one symbol's ticks into a chart of cumulative bars.
///
/// Exactly one bar is active at a time. A tick for a later slot closes the
/// active bar, stores it and opens a new one; skipped slots stay empty.
#[derive(Debug)]
pub struct SymbolIngestor {
    chart: SymbolChart<CumulativeBar>,
    active: Option<(usize, CumulativeBar)>,
}

impl SymbolIngestor {
    /// Create an ingestor for one symbol over a session window.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the window cannot hold a single slot.
    pub fn new(symbol: impl Into<String>, window: SessionWindow) -> Result<Self> {
        Ok(Self {
            chart: SymbolChart::new(symbol, window.start, window.end, window.granularity_ms)?,
            active: None,
        })
    }

    /// Route a tick to its slot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a negative or unencodable price, which
    /// leaves the active bar untouched, or when the bar rejects the tick after
    /// updating it. Such a bar is reset and is not stored unless later ticks
    /// refill it.
    pub fn ingest(&mut self, tick: &Tick) -> Result<IngestOutcome> {
        if tick.price.is_sign_negative() && !tick.price.is_zero() {
            return Err(MarketDataError::invalid_argument(format!(
                "[{}] negative price {}",
                tick.symbol, tick.price
            )));
        }
        // Unencodable prices must not reach the active bar.
        price_to_cents(tick.price)?;

        let Some(slot) = self.chart.slot_of(tick.transaction_timestamp) else {
            debug!(symbol = %tick.symbol, ts = %tick.transaction_timestamp, "tick outside session");
            record_out_of_session_tick(&tick.symbol);
            return Ok(IngestOutcome::OutOfSession);
        };

        match self.active.as_ref().map(|(index, _)| *index) {
            Some(index) if slot < index => {
                // Stored bars are closed, so this add is a no-op.
                if let Some(stored) = self.chart.get_bar_mut(slot) {
                    stored.add(tick)?;
                }
                trace!(symbol = %tick.symbol, slot, active = index, "late tick dropped");
                record_late_tick(&tick.symbol);
                return Ok(IngestOutcome::Late);
            }
            Some(index) if slot > index => self.close_active()?,
            _ => {}
        }

        let (_, bar) = self.active.get_or_insert_with(|| (slot, CumulativeBar::new()));
        if let Err(e) = bar.add(tick) {
            warn!(symbol = %tick.symbol, slot, error = %e, "discarding invalid bar");
            bar.reset();
            return Err(e);
        }
        record_tick_ingested(&tick.symbol);
        Ok(IngestOutcome::Accepted)
    }

    /// Mark the active bar as possibly incomplete.
    ///
    /// Returns `false` when no bar is active.
    pub fn mark_missing_data(&mut self) -> bool {
        match self.active.as_mut() {
            Some((_, bar)) => {
                bar.mark_missing_data();
                true
            }
            None => false,
        }
    }

    /// Slot of the active bar.
    #[must_use]
    pub fn active_slot(&self) -> Option<usize> {
        self.active.as_ref().map(|(index, _)| *index)
    }

    /// The chart of stored (closed) bars.
    #[must_use]
    pub const fn chart(&self) -> &SymbolChart<CumulativeBar> {
        &self.chart
    }

    /// Close the active bar and return the chart.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the active bar cannot be stored.
    pub fn finish(mut self) -> Result<SymbolChart<CumulativeBar>> {
        self.close_active()?;
        Ok(self.chart)
    }

    fn close_active(&mut self) -> Result<()> {
        if let Some((index, mut bar)) = self.active.take() {
            if bar.state() == BarState::Empty {
                debug!(symbol = %self.chart.symbol(), slot = index, "empty bar not stored");
                return Ok(());
            }
            bar.close();
            self.chart.set_bar(Some(bar), index)?;
            record_bar_closed(self.chart.symbol());
        }
        Ok(())
    }
}
