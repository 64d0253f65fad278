//! OHLCV bars.
//!
//! - [`Bar`]: a closed, validated OHLCV value.
//! - [`CumulativeBar`]: an in-progress bar that accumulates ticks for one time slot.
//!
//! Prices are stored as integer cents so repeated aggregation never drifts.

mod bar;
mod cumulative;

pub use bar::Bar;
pub use cumulative::{BarState, CumulativeBar};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cents_to_price;

/// A price field of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarField {
    /// Open price.
    Open,
    /// High price.
    High,
    /// Low price.
    Low,
    /// Close price.
    Close,
}

/// Read access shared by closed and cumulative bars.
pub trait OhlcvBar {
    /// Open price in cents.
    fn open_cents(&self) -> i32;
    /// High price in cents.
    fn high_cents(&self) -> i32;
    /// Low price in cents.
    fn low_cents(&self) -> i32;
    /// Close price in cents.
    fn close_cents(&self) -> i32;
    /// Traded volume.
    fn volume(&self) -> i64;

    /// Open price.
    fn open_price(&self) -> Decimal {
        cents_to_price(self.open_cents())
    }

    /// High price.
    fn high_price(&self) -> Decimal {
        cents_to_price(self.high_cents())
    }

    /// Low price.
    fn low_price(&self) -> Decimal {
        cents_to_price(self.low_cents())
    }

    /// Close price.
    fn close_price(&self) -> Decimal {
        cents_to_price(self.close_cents())
    }

    /// A single price field.
    fn field(&self, field: BarField) -> Decimal {
        match field {
            BarField::Open => self.open_price(),
            BarField::High => self.high_price(),
            BarField::Low => self.low_price(),
            BarField::Close => self.close_price(),
        }
    }

    /// Whether any price field is zero.
    fn has_any_zero_price(&self) -> bool {
        self.open_cents() == 0
            || self.high_cents() == 0
            || self.low_cents() == 0
            || self.close_cents() == 0
    }

    /// Whether any price field is positive.
    fn has_non_zero_prices(&self) -> bool {
        self.open_cents() > 0
            || self.high_cents() > 0
            || self.low_cents() > 0
            || self.close_cents() > 0
    }

    /// Whether any price or the volume differs from zero.
    fn any_value_non_zero(&self) -> bool {
        self.open_cents() != 0
            || self.high_cents() != 0
            || self.low_cents() != 0
            || self.close_cents() != 0
            || self.volume() != 0
    }
}
