//! Fixed-width binary tick record.
//!
//! # Layout
//!
//! All integers are big-endian.
//!
//! | Offset | Length | Field |
//! |--------|--------|-------|
//! | 0 | 4 | Transaction timestamp (internal clock, `i32`) |
//! | 4 | 2 | Symbol code (`u16`) |
//! | 6 | 4 | Price in cents (`i32`) |
//! | 10 | 4 | Quantity (`i32`) |
//! | 14 | 4 | Insertion timestamp (internal clock, `i32`) |

use std::fmt;

use rust_decimal::Decimal;

use crate::domain::{InternalTimestamp, SymbolCode, SymbolDictionary, cents_to_price};
use crate::error::{MarketDataError, Result};

/// Transaction timestamp field length.
pub const TRANSACTION_TS_FIELD_LENGTH: usize = 4;
/// Symbol code field length.
pub const SYMBOL_FIELD_LENGTH: usize = 2;
/// Price field length.
pub const PRICE_FIELD_LENGTH: usize = 4;
/// Quantity field length.
pub const QUANTITY_FIELD_LENGTH: usize = 4;
/// Insertion timestamp field length.
pub const INSERTION_TS_FIELD_LENGTH: usize = 4;

/// Transaction timestamp offset.
pub const TRANSACTION_TS_FIELD_OFFSET: usize = 0;
/// Symbol code offset.
pub const SYMBOL_FIELD_OFFSET: usize = TRANSACTION_TS_FIELD_OFFSET + TRANSACTION_TS_FIELD_LENGTH;
/// Price offset.
pub const PRICE_FIELD_OFFSET: usize = SYMBOL_FIELD_OFFSET + SYMBOL_FIELD_LENGTH;
/// Quantity offset.
pub const QUANTITY_FIELD_OFFSET: usize = PRICE_FIELD_OFFSET + PRICE_FIELD_LENGTH;
/// Insertion timestamp offset.
pub const INSERTION_TS_FIELD_OFFSET: usize = QUANTITY_FIELD_OFFSET + QUANTITY_FIELD_LENGTH;

/// Total record length in bytes.
pub const RECORD_LENGTH: usize = INSERTION_TS_FIELD_OFFSET + INSERTION_TS_FIELD_LENGTH;

/// Half of the smallest representable price tick (one cent).
pub const HALF_TICK: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// A tick encoded into its fixed-width buffer.
///
/// The record owns its buffer. Field accessors read in place and never allocate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickRecord {
    bytes: [u8; RECORD_LENGTH],
}

impl TickRecord {
    /// Assemble a record from field values; the insertion timestamp starts at zero.
    #[must_use]
    pub fn from_fields(
        transaction_timestamp: InternalTimestamp,
        symbol_code: SymbolCode,
        price_cents: i32,
        quantity: i32,
    ) -> Self {
        let mut record = Self {
            bytes: [0; RECORD_LENGTH],
        };
        record.write_i32(TRANSACTION_TS_FIELD_OFFSET, transaction_timestamp.millis());
        record.bytes[SYMBOL_FIELD_OFFSET..SYMBOL_FIELD_OFFSET + SYMBOL_FIELD_LENGTH]
            .copy_from_slice(&symbol_code.value().to_be_bytes());
        record.write_i32(PRICE_FIELD_OFFSET, price_cents);
        record.write_i32(QUANTITY_FIELD_OFFSET, quantity);
        record
    }

    /// Wrap a copy of an existing buffer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `bytes` is not exactly [`RECORD_LENGTH`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut record = Self {
            bytes: [0; RECORD_LENGTH],
        };
        record.replace_bytes(bytes)?;
        Ok(record)
    }

    /// Overwrite the backing buffer byte-for-byte.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `bytes` is not exactly [`RECORD_LENGTH`] long;
    /// the record is left untouched in that case.
    pub fn replace_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != RECORD_LENGTH {
            return Err(MarketDataError::invalid_argument(format!(
                "invalid value. Length must be {RECORD_LENGTH}, got {}",
                bytes.len()
            )));
        }
        self.bytes.copy_from_slice(bytes);
        Ok(())
    }

    /// The backing buffer.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; RECORD_LENGTH] {
        &self.bytes
    }

    /// Transaction timestamp.
    #[must_use]
    pub fn transaction_timestamp(&self) -> InternalTimestamp {
        InternalTimestamp::from_millis(self.read_i32(TRANSACTION_TS_FIELD_OFFSET))
    }

    /// Symbol code.
    #[must_use]
    pub const fn symbol_code(&self) -> SymbolCode {
        SymbolCode::new(u16::from_be_bytes([
            self.bytes[SYMBOL_FIELD_OFFSET],
            self.bytes[SYMBOL_FIELD_OFFSET + 1],
        ]))
    }

    /// Price in cents.
    #[must_use]
    pub fn price_cents(&self) -> i32 {
        self.read_i32(PRICE_FIELD_OFFSET)
    }

    /// Price as a decimal.
    #[must_use]
    pub fn price(&self) -> Decimal {
        cents_to_price(self.price_cents())
    }

    /// Quantity.
    #[must_use]
    pub fn quantity(&self) -> i32 {
        self.read_i32(QUANTITY_FIELD_OFFSET)
    }

    /// Insertion timestamp.
    #[must_use]
    pub fn insertion_timestamp(&self) -> InternalTimestamp {
        InternalTimestamp::from_millis(self.read_i32(INSERTION_TS_FIELD_OFFSET))
    }

    /// Write the insertion timestamp in place.
    pub fn set_insertion_timestamp(&mut self, now: InternalTimestamp) {
        self.write_i32(INSERTION_TS_FIELD_OFFSET, now.millis());
    }

    /// Compare with another record, ignoring the insertion timestamp.
    ///
    /// Prices match when they differ by less than [`HALF_TICK`]. Symbols are
    /// compared by name; a code unknown to the dictionary never matches.
    pub fn equals_ignoring_insertion<D>(&self, other: &Self, dictionary: &D) -> bool
    where
        D: SymbolDictionary + ?Sized,
    {
        let same_symbol = match (
            dictionary.symbol_of(self.symbol_code()),
            dictionary.symbol_of(other.symbol_code()),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };

        same_symbol
            && (self.price() - other.price()).abs() < HALF_TICK
            && self.quantity() == other.quantity()
            && self.transaction_timestamp() == other.transaction_timestamp()
    }

    fn read_i32(&self, offset: usize) -> i32 {
        let mut field = [0_u8; 4];
        field.copy_from_slice(&self.bytes[offset..offset + 4]);
        i32::from_be_bytes(field)
    }

    fn write_i32(&mut self, offset: usize, value: i32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }
}

impl fmt::Debug for TickRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickRecord")
            .field("transaction_timestamp", &self.transaction_timestamp())
            .field("symbol_code", &self.symbol_code())
            .field("price_cents", &self.price_cents())
            .field("quantity", &self.quantity())
            .field("insertion_timestamp", &self.insertion_timestamp())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::InMemorySymbolDictionary;

    fn record(ts: i32, code: u16, cents: i32, quantity: i32) -> TickRecord {
        TickRecord::from_fields(
            InternalTimestamp::from_millis(ts),
            SymbolCode::new(code),
            cents,
            quantity,
        )
    }

    #[test]
    fn record_length_is_eighteen_bytes() {
        assert_eq!(RECORD_LENGTH, 18);
        assert_eq!(INSERTION_TS_FIELD_OFFSET, 14);
        assert_eq!(HALF_TICK, dec!(0.005));
    }

    #[test]
    fn fields_are_written_big_endian_at_fixed_offsets() {
        let record = record(34_200_000, 3, 10_123, 500);
        let bytes = record.as_bytes();

        assert_eq!(&bytes[0..4], &34_200_000_i32.to_be_bytes());
        assert_eq!(&bytes[4..6], &[0, 3]);
        assert_eq!(&bytes[6..10], &10_123_i32.to_be_bytes());
        assert_eq!(&bytes[10..14], &500_i32.to_be_bytes());
        assert_eq!(&bytes[14..18], &[0, 0, 0, 0]);
    }

    #[test]
    fn insertion_timestamp_is_written_in_place() {
        let mut record = record(1_000, 1, 100, 10);
        record.set_insertion_timestamp(InternalTimestamp::from_millis(2_000));

        assert_eq!(record.insertion_timestamp().millis(), 2_000);
        assert_eq!(record.transaction_timestamp().millis(), 1_000);
        assert_eq!(record.quantity(), 10);
    }

    #[test]
    fn replace_bytes_rejects_wrong_length() {
        let mut record = record(1_000, 1, 100, 10);
        let before = record;

        let result = record.replace_bytes(&[0; 17]);

        assert!(matches!(result, Err(MarketDataError::InvalidArgument(_))));
        assert_eq!(record, before);
    }

    #[test]
    fn replace_bytes_overwrites_every_byte() {
        let mut record = record(1_000, 1, 100, 10);
        let other = self::record(5_000, 7, 999, 42);

        record.replace_bytes(other.as_bytes()).unwrap();

        assert_eq!(record, other);
    }

    #[test]
    fn equality_ignores_insertion_timestamp() {
        let dictionary = InMemorySymbolDictionary::from_symbols(["AAPL", "MSFT"]).unwrap();
        let a = record(1_000, 0, 10_123, 500);
        let mut b = a;
        b.set_insertion_timestamp(InternalTimestamp::from_millis(9_999));

        assert!(a.equals_ignoring_insertion(&b, &dictionary));
        assert!(!a.equals_ignoring_insertion(&record(1_000, 1, 10_123, 500), &dictionary));
        assert!(!a.equals_ignoring_insertion(&record(1_000, 0, 10_124, 500), &dictionary));
        assert!(!a.equals_ignoring_insertion(&record(1_000, 0, 10_123, 501), &dictionary));
        assert!(!a.equals_ignoring_insertion(&record(1_001, 0, 10_123, 500), &dictionary));
    }

    #[test]
    fn unknown_symbol_code_never_matches() {
        let dictionary = InMemorySymbolDictionary::from_symbols(["AAPL"]).unwrap();
        let a = record(1_000, 9, 100, 1);

        assert!(!a.equals_ignoring_insertion(&a, &dictionary));
    }
}
