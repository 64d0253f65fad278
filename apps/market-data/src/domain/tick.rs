//! Trade tick value object.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::clock::InternalTimestamp;

/// One observed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Symbol traded.
    pub symbol: String,
    /// Trade price.
    pub price: Decimal,
    /// Number of shares traded.
    pub quantity: u32,
    /// Transaction time.
    pub transaction_timestamp: InternalTimestamp,
    /// Time the tick entered the buffer (zero until set).
    pub insertion_timestamp: InternalTimestamp,
}

impl Tick {
    /// Create a tick with no insertion timestamp.
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        quantity: u32,
        transaction_timestamp: InternalTimestamp,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            quantity,
            transaction_timestamp,
            insertion_timestamp: InternalTimestamp::ZERO,
        }
    }

    /// Set the insertion timestamp.
    #[must_use]
    pub fn with_insertion_timestamp(mut self, timestamp: InternalTimestamp) -> Self {
        self.insertion_timestamp = timestamp;
        self
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "symbol={} price={} quantity={} trans.ts={} insertion.ts={}",
            self.symbol,
            self.price,
            self.quantity,
            self.transaction_timestamp,
            self.insertion_timestamp
        )
    }
}
