//! Closed OHLCV bar with fixed-point cent prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::OhlcvBar;
use crate::domain::price_to_cents;
use crate::error::{MarketDataError, Result};

/// An OHLCV value, validated on construction.
///
/// The all-zero bar is the uninitialized sentinel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "BarFields")]
pub struct Bar {
    pub(super) open_cents: i32,
    pub(super) high_cents: i32,
    pub(super) low_cents: i32,
    pub(super) close_cents: i32,
    pub(super) volume: i64,
}

/// Unvalidated wire form used for deserialization.
#[derive(Deserialize)]
struct BarFields {
    open_cents: i32,
    high_cents: i32,
    low_cents: i32,
    close_cents: i32,
    volume: i64,
}

impl TryFrom<BarFields> for Bar {
    type Error = MarketDataError;

    fn try_from(fields: BarFields) -> Result<Self> {
        Self::new(
            fields.open_cents,
            fields.high_cents,
            fields.low_cents,
            fields.close_cents,
            fields.volume,
        )
    }
}

impl Bar {
    /// The uninitialized sentinel.
    pub const ZERO: Self = Self {
        open_cents: 0,
        high_cents: 0,
        low_cents: 0,
        close_cents: 0,
        volume: 0,
    };

    /// Create a bar from cent prices.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the bar breaks `low ≤ open, close ≤ high`,
    /// has a negative price, or has a negative volume with non-zero prices.
    pub fn new(
        open_cents: i32,
        high_cents: i32,
        low_cents: i32,
        close_cents: i32,
        volume: i64,
    ) -> Result<Self> {
        let bar = Self {
            open_cents,
            high_cents,
            low_cents,
            close_cents,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar from decimal prices, rounding each to the nearest cent.
    pub fn from_prices(
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: i64,
    ) -> Result<Self> {
        Self::new(
            price_to_cents(open)?,
            price_to_cents(high)?,
            price_to_cents(low)?,
            price_to_cents(close)?,
            volume,
        )
    }

    /// Replace every field, validating the new values first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` as [`Self::new`]; the bar is unchanged on failure.
    pub fn set(
        &mut self,
        open_cents: i32,
        high_cents: i32,
        low_cents: i32,
        close_cents: i32,
        volume: i64,
    ) -> Result<()> {
        *self = Self::new(open_cents, high_cents, low_cents, close_cents, volume)?;
        Ok(())
    }

    /// Check the bar invariants.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.open_cents < self.low_cents {
            return Err(MarketDataError::invalid_argument("open price is lower than low price"));
        }
        if self.close_cents < self.low_cents {
            return Err(MarketDataError::invalid_argument("close price is lower than low price"));
        }
        if self.open_cents > self.high_cents {
            return Err(MarketDataError::invalid_argument("open price is higher than high price"));
        }
        if self.close_cents > self.high_cents {
            return Err(MarketDataError::invalid_argument("close price is higher than high price"));
        }
        if self.open_cents < 0 || self.close_cents < 0 || self.low_cents < 0 || self.high_cents < 0
        {
            return Err(MarketDataError::invalid_argument(
                "all prices must be positive, at least one is negative",
            ));
        }
        if self.volume < 0 && self.has_non_zero_prices() {
            return Err(MarketDataError::invalid_argument("the volume must be positive"));
        }
        Ok(())
    }
}

impl OhlcvBar for Bar {
    fn open_cents(&self) -> i32 {
        self.open_cents
    }

    fn high_cents(&self) -> i32 {
        self.high_cents
    }

    fn low_cents(&self) -> i32 {
        self.low_cents
    }

    fn close_cents(&self) -> i32 {
        self.close_cents
    }

    fn volume(&self) -> i64 {
        self.volume
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{open:{},high:{},low:{},close:{},volume:{}}}",
            self.open_price(),
            self.high_price(),
            self.low_price(),
            self.close_price(),
            self.volume
        )
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;
    use crate::bars::BarField;

    #[test]
    fn valid_bar_exposes_decimal_prices() {
        let bar = Bar::from_prices(dec!(100.00), dec!(101.50), dec!(99.75), dec!(100.25), 1_200)
            .unwrap();

        assert_eq!(bar.open_price(), dec!(100.00));
        assert_eq!(bar.field(BarField::High), dec!(101.50));
        assert_eq!(bar.low_cents(), 9_975);
        assert_eq!(bar.volume(), 1_200);
        assert_eq!(
            bar.to_string(),
            "{open:100.00,high:101.50,low:99.75,close:100.25,volume:1200}"
        );
    }

    #[test_case(90, 100, 95, 96, 1 ; "open below low")]
    #[test_case(96, 100, 95, 90, 1 ; "close below low")]
    #[test_case(101, 100, 95, 96, 1 ; "open above high")]
    #[test_case(96, 100, 95, 101, 1 ; "close above high")]
    #[test_case(-1, 0, -1, 0, 1 ; "negative prices")]
    #[test_case(96, 100, 95, 97, -5 ; "negative volume")]
    fn invalid_bars_are_rejected(open: i32, high: i32, low: i32, close: i32, volume: i64) {
        assert!(matches!(
            Bar::new(open, high, low, close, volume),
            Err(MarketDataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_sentinel_is_exempt_from_volume_rule() {
        assert!(Bar::new(0, 0, 0, 0, -1).is_ok());
        assert!(!Bar::ZERO.any_value_non_zero());
        assert!(Bar::ZERO.has_any_zero_price());
    }

    #[test]
    fn set_keeps_previous_values_on_failure() {
        let mut bar = Bar::new(100, 110, 90, 105, 7).unwrap();

        assert!(bar.set(100, 90, 80, 85, 7).is_err());
        assert_eq!(bar.high_cents(), 110);

        bar.set(200, 210, 190, 205, 3).unwrap();
        assert_eq!(bar.open_cents(), 200);
    }

    #[test]
    fn deserialization_validates() {
        let valid = r#"{"open_cents":100,"high_cents":110,"low_cents":90,"close_cents":105,"volume":7}"#;
        let invalid = r#"{"open_cents":100,"high_cents":90,"low_cents":80,"close_cents":85,"volume":7}"#;

        let bar: Bar = serde_json::from_str(valid).unwrap();
        assert_eq!(bar.close_cents(), 105);
        assert!(serde_json::from_str::<Bar>(invalid).is_err());
        assert_eq!(serde_json::to_string(&bar).unwrap(), valid);
    }
}
