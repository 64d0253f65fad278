//! Fixed-point cent conversion for prices.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{MarketDataError, Result};

/// Convert a decimal price to integer cents, `round(price × 100)`.
///
/// # Errors
///
/// Returns `InvalidArgument` if the cent value does not fit in 32 bits.
pub fn price_to_cents(price: Decimal) -> Result<i32> {
    (price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i32()
        .ok_or_else(|| MarketDataError::invalid_argument(format!("price out of range: {price}")))
}

/// Convert integer cents to a decimal price with two fractional digits.
#[must_use]
pub fn cents_to_price(cents: i32) -> Decimal {
    Decimal::new(i64::from(cents), 2)
}
