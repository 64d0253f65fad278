//! Tick record codec.
//!
//! Encodes a [`Tick`] into an 18-byte [`TickRecord`] and decodes it back,
//! resolving symbols through a borrowed [`SymbolDictionary`]. Symbol codes
//! keep records fixed-width so decode on the ingestion hot path needs no
//! allocation beyond the returned tick.

mod record;

pub use record::{
    HALF_TICK, INSERTION_TS_FIELD_OFFSET, PRICE_FIELD_OFFSET, QUANTITY_FIELD_OFFSET,
    RECORD_LENGTH, SYMBOL_FIELD_OFFSET, TRANSACTION_TS_FIELD_OFFSET, TickRecord,
};

use crate::domain::{InternalTimestamp, SymbolDictionary, Tick, price_to_cents};
use crate::error::{MarketDataError, Result};

/// Encoder/decoder bound to one dictionary generation.
pub struct TickRecordCodec<'a, D: SymbolDictionary + ?Sized> {
    dictionary: &'a D,
}

impl<D: SymbolDictionary + ?Sized> Clone for TickRecordCodec<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: SymbolDictionary + ?Sized> Copy for TickRecordCodec<'_, D> {}

impl<D: SymbolDictionary + ?Sized> std::fmt::Debug for TickRecordCodec<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickRecordCodec").finish_non_exhaustive()
    }
}

impl<'a, D: SymbolDictionary + ?Sized> TickRecordCodec<'a, D> {
    /// Create a codec over a dictionary.
    #[must_use]
    pub const fn new(dictionary: &'a D) -> Self {
        Self { dictionary }
    }

    /// The dictionary this codec resolves symbols with.
    #[must_use]
    pub const fn dictionary(&self) -> &'a D {
        self.dictionary
    }

    /// Encode a tick. The insertion timestamp is left at zero.
    ///
    /// # Errors
    ///
    /// - `MissingSymbol` if the symbol is not in the dictionary.
    /// - `InvalidArgument` if the price or quantity does not fit its 4-byte field.
    pub fn encode(&self, tick: &Tick) -> Result<TickRecord> {
        let code = self.dictionary.code_of(&tick.symbol).ok_or_else(|| {
            MarketDataError::missing_symbol(
                &tick.symbol,
                format!(
                    "no code found for symbol '{}' (the dictionary may be mid-update)",
                    tick.symbol
                ),
            )
        })?;
        let price_cents = price_to_cents(tick.price)?;
        let quantity = i32::try_from(tick.quantity).map_err(|_| {
            MarketDataError::invalid_argument(format!("quantity out of range: {}", tick.quantity))
        })?;

        Ok(TickRecord::from_fields(
            tick.transaction_timestamp,
            code,
            price_cents,
            quantity,
        ))
    }

    /// Decode a record.
    ///
    /// # Errors
    ///
    /// - `MissingSymbol` if the symbol code is not in the dictionary.
    /// - `InvalidArgument` if the stored quantity is negative.
    pub fn decode(&self, record: &TickRecord) -> Result<Tick> {
        let code = record.symbol_code();
        let symbol = self.dictionary.symbol_of(code).ok_or_else(|| {
            MarketDataError::missing_symbol(
                code.to_string(),
                format!("no symbol found for code {code}"),
            )
        })?;
        let quantity = u32::try_from(record.quantity()).map_err(|_| {
            MarketDataError::invalid_argument(format!(
                "negative quantity in record: {}",
                record.quantity()
            ))
        })?;

        Ok(Tick {
            symbol: symbol.to_owned(),
            price: record.price(),
            quantity,
            transaction_timestamp: record.transaction_timestamp(),
            insertion_timestamp: record.insertion_timestamp(),
        })
    }

    /// Decode a raw buffer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` on a length mismatch, otherwise as [`Self::decode`].
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Tick> {
        self.decode(&TickRecord::from_bytes(bytes)?)
    }

    /// Write the insertion timestamp into a record in place.
    pub fn set_insertion_timestamp(&self, record: &mut TickRecord, now: InternalTimestamp) {
        record.set_insertion_timestamp(now);
    }

    /// Overwrite a record's buffer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `bytes` is not exactly [`RECORD_LENGTH`] long.
    pub fn replace_buffer(&self, record: &mut TickRecord, bytes: &[u8]) -> Result<()> {
        record.replace_bytes(bytes)
    }

    /// Compare two records ignoring the insertion timestamp.
    pub fn equals_ignoring_insertion(&self, a: &TickRecord, b: &TickRecord) -> bool {
        a.equals_ignoring_insertion(b, self.dictionary)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{InMemorySymbolDictionary, SymbolCode};

    fn dictionary() -> InMemorySymbolDictionary {
        let mut dictionary = InMemorySymbolDictionary::new();
        dictionary.insert("AAPL", SymbolCode::new(3)).unwrap();
        dictionary.insert("MSFT", SymbolCode::new(4)).unwrap();
        dictionary
    }

    #[test]
    fn encodes_and_decodes_reference_tick() {
        let dictionary = dictionary();
        let codec = TickRecordCodec::new(&dictionary);
        let tick = Tick::new(
            "AAPL",
            dec!(101.23),
            500,
            InternalTimestamp::from_millis(34_200_000),
        );

        let record = codec.encode(&tick).unwrap();
        let decoded = codec.decode(&record).unwrap();

        assert_eq!(record.symbol_code(), SymbolCode::new(3));
        assert!((decoded.price - dec!(101.23)).abs() <= dec!(0.01));
        assert_eq!(decoded.quantity, 500);
        assert_eq!(decoded.symbol, "AAPL");
        assert_eq!(decoded.transaction_timestamp.millis(), 34_200_000);
        assert_eq!(decoded.insertion_timestamp, InternalTimestamp::ZERO);
    }

    #[test]
    fn encode_fails_for_unknown_symbol() {
        let dictionary = dictionary();
        let codec = TickRecordCodec::new(&dictionary);
        let tick = Tick::new("GOOGL", dec!(1), 1, InternalTimestamp::ZERO);

        match codec.encode(&tick) {
            Err(MarketDataError::MissingSymbol { symbol, .. }) => assert_eq!(symbol, "GOOGL"),
            other => panic!("expected MissingSymbol, got {other:?}"),
        }
    }

    #[test]
    fn decode_fails_for_unknown_code() {
        let dictionary = dictionary();
        let codec = TickRecordCodec::new(&dictionary);
        let record = TickRecord::from_fields(InternalTimestamp::ZERO, SymbolCode::new(99), 1, 1);

        match codec.decode(&record) {
            Err(MarketDataError::MissingSymbol { symbol, .. }) => assert_eq!(symbol, "99"),
            other => panic!("expected MissingSymbol, got {other:?}"),
        }
    }

    #[test]
    fn decode_bytes_checks_length() {
        let dictionary = dictionary();
        let codec = TickRecordCodec::new(&dictionary);

        assert!(matches!(
            codec.decode_bytes(&[0; RECORD_LENGTH + 1]),
            Err(MarketDataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn insertion_timestamp_survives_decode() {
        let dictionary = dictionary();
        let codec = TickRecordCodec::new(&dictionary);
        let tick = Tick::new("MSFT", dec!(410.5), 10, InternalTimestamp::from_millis(1));
        let mut record = codec.encode(&tick).unwrap();

        codec.set_insertion_timestamp(&mut record, InternalTimestamp::from_millis(77));
        let decoded = codec.decode(&record).unwrap();

        assert_eq!(decoded.insertion_timestamp.millis(), 77);
        assert!(codec.equals_ignoring_insertion(&record, &codec.encode(&tick).unwrap()));
    }

    #[test]
    fn replace_buffer_validates_length() {
        let dictionary = dictionary();
        let codec = TickRecordCodec::new(&dictionary);
        let mut record = TickRecord::from_fields(InternalTimestamp::ZERO, SymbolCode::new(3), 1, 1);

        let result = codec.replace_buffer(&mut record, &[1, 2, 3]);

        assert!(matches!(result, Err(MarketDataError::InvalidArgument(_))));
    }

    proptest! {
        #[test]
        fn round_trip_preserves_tick(
            cents in 0_i64..=2_000_000_000,
            extra in 0_u32..100,
            quantity in 0_u32..=i32::MAX as u32,
            ts in any::<i32>(),
            msft in any::<bool>(),
        ) {
            let dictionary = dictionary();
            let codec = TickRecordCodec::new(&dictionary);
            // Up to two extra decimal places exercise rounding.
            let price = Decimal::new(cents * 100 + i64::from(extra), 4);
            let symbol = if msft { "MSFT" } else { "AAPL" };
            let tick = Tick::new(symbol, price, quantity, InternalTimestamp::from_millis(ts));

            let decoded = codec.decode(&codec.encode(&tick).unwrap()).unwrap();

            prop_assert!((decoded.price - price).abs() <= dec!(0.01));
            prop_assert_eq!(decoded.quantity, quantity);
            prop_assert_eq!(decoded.transaction_timestamp, tick.transaction_timestamp);
            prop_assert_eq!(decoded.symbol, symbol);
        }
    }
}
