//! Cumulative bar: accumulates ticks for one time slot, then closes.
//!
//! # Lifecycle
//!
//! ```text
//! Empty --add--> Accumulating --close--> Closed
//!   ^                                      |
//!   +----------------reset-----------------+
//! ```
//!
//! `add` on a closed bar is a no-op. `reset` clears prices, volume and the
//! closed flag but keeps the tick count and the missing-data mark.

use serde::Serialize;
use std::fmt;
use tracing::trace;

use super::{Bar, OhlcvBar};
use crate::domain::{Tick, price_to_cents};
use crate::error::{MarketDataError, Result};

/// Lifecycle state of a [`CumulativeBar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarState {
    /// No price data since creation or the last reset.
    Empty,
    /// At least one tick with data has been added.
    Accumulating,
    /// Closed; further ticks are ignored.
    Closed,
}

/// A bar under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CumulativeBar {
    bar: Bar,
    tick_count: u64,
    closed: bool,
    missing_data: bool,
}

impl CumulativeBar {
    /// Create an empty bar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tick.
    ///
    /// Ignored if the bar is closed. The first tick with data sets all four
    /// prices; later ticks move close, high, low and volume.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the price does not fit in cents, the volume
    /// overflows, or the bar invariants fail after the update. An invariant
    /// failure leaves the bar in its invalid state; callers must discard or
    /// reset it.
    pub fn add(&mut self, tick: &Tick) -> Result<()> {
        if self.closed {
            trace!(symbol = %tick.symbol, "tick ignored, bar already closed");
            return Ok(());
        }

        let price = price_to_cents(tick.price)?;

        if !self.bar.any_value_non_zero() {
            self.bar.open_cents = price;
            self.bar.high_cents = price;
            self.bar.low_cents = price;
        }

        self.bar.close_cents = price;
        self.bar.high_cents = self.bar.high_cents.max(price);
        self.bar.low_cents = self.bar.low_cents.min(price);
        self.bar.volume = self
            .bar
            .volume
            .checked_add(i64::from(tick.quantity))
            .ok_or_else(|| MarketDataError::invalid_argument("bar volume overflow"))?;

        self.bar.validate()?;
        self.tick_count += 1;
        Ok(())
    }

    /// Close the bar. Idempotent.
    pub const fn close(&mut self) {
        self.closed = true;
    }

    /// Clear prices, volume and the closed flag.
    pub const fn reset(&mut self) {
        self.bar = Bar::ZERO;
        self.closed = false;
    }

    /// Zero the tick count.
    pub const fn clear_tick_count(&mut self) {
        self.tick_count = 0;
    }

    /// Mark that a gap was observed in the surrounding period.
    ///
    /// Completeness of this bar is uncertain; it does not mean all data is
    /// missing, and it does not block further ticks.
    pub const fn mark_missing_data(&mut self) {
        self.missing_data = true;
    }

    /// Remove the missing-data mark.
    pub const fn clear_missing_data(&mut self) {
        self.missing_data = false;
    }

    /// Whether the bar was marked as possibly missing data.
    #[must_use]
    pub const fn is_marked_missing_data(&self) -> bool {
        self.missing_data
    }

    /// Whether the bar is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of ticks accepted.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Whether any price or volume has been recorded.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.bar.any_value_non_zero()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BarState {
        if self.closed {
            BarState::Closed
        } else if self.has_data() {
            BarState::Accumulating
        } else {
            BarState::Empty
        }
    }

    /// Snapshot of the current OHLCV values.
    #[must_use]
    pub const fn to_bar(&self) -> Bar {
        self.bar
    }
}

impl OhlcvBar for CumulativeBar {
    fn open_cents(&self) -> i32 {
        self.bar.open_cents
    }

    fn high_cents(&self) -> i32 {
        self.bar.high_cents
    }

    fn low_cents(&self) -> i32 {
        self.bar.low_cents
    }

    fn close_cents(&self) -> i32 {
        self.bar.close_cents
    }

    fn volume(&self) -> i64 {
        self.bar.volume
    }
}

impl fmt::Display for CumulativeBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks:{}{}",
            self.bar,
            self.tick_count,
            if self.closed { " [closed]" } else { " [open]" }
        )
    }
}
