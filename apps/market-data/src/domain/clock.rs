//! Internal timestamps relative to the exchange-local start of a trading day.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MarketDataError, Result};

/// Milliseconds since exchange-local midnight of the trading day.
///
/// This is the representation written into tick records and used for chart
/// geometry. It fits a 4-byte signed integer by construction.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InternalTimestamp(i32);

impl InternalTimestamp {
    /// The reference point itself.
    pub const ZERO: Self = Self(0);

    /// Create from raw milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i32) -> Self {
        Self(millis)
    }

    /// Raw milliseconds since the reference point.
    #[must_use]
    pub const fn millis(self) -> i32 {
        self.0
    }

    /// Convert an exchange-local time of day.
    #[must_use]
    pub fn from_time_of_day(time: NaiveTime) -> Self {
        let millis = time.num_seconds_from_midnight() * 1000 + time.nanosecond() / 1_000_000;
        // At most 86_400_999, well inside i32.
        Self(millis as i32)
    }
}

impl fmt::Display for InternalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<i32> for InternalTimestamp {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Converts between wall-clock instants and [`InternalTimestamp`]s for one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalClock {
    trading_day: NaiveDate,
    utc_offset: FixedOffset,
}

impl InternalClock {
    /// Create a clock for a trading day in an exchange with a fixed UTC offset.
    #[must_use]
    pub const fn new(trading_day: NaiveDate, utc_offset: FixedOffset) -> Self {
        Self {
            trading_day,
            utc_offset,
        }
    }

    /// Create a clock from an offset expressed in minutes east of UTC.
    pub fn from_offset_minutes(trading_day: NaiveDate, minutes: i32) -> Result<Self> {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                MarketDataError::invalid_argument(format!("UTC offset out of range: {minutes}m"))
            })?;
        Ok(Self::new(trading_day, offset))
    }

    /// The trading day this clock is anchored to.
    #[must_use]
    pub const fn trading_day(&self) -> NaiveDate {
        self.trading_day
    }

    /// The exchange UTC offset.
    #[must_use]
    pub const fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// The UTC instant of exchange-local midnight.
    #[must_use]
    pub fn reference(&self) -> DateTime<Utc> {
        let local_midnight = self.trading_day.and_time(NaiveTime::MIN);
        let offset = TimeDelta::seconds(i64::from(self.utc_offset.local_minus_utc()));
        (local_midnight - offset).and_utc()
    }

    /// Convert a UTC instant into an internal timestamp.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the instant is too far from the reference
    /// point to fit in 32 bits.
    pub fn to_internal(&self, at: DateTime<Utc>) -> Result<InternalTimestamp> {
        let millis = (at - self.reference()).num_milliseconds();
        i32::try_from(millis)
            .map(InternalTimestamp)
            .map_err(|_| {
                MarketDataError::invalid_argument(format!(
                    "{at} is out of internal timestamp range for trading day {}",
                    self.trading_day
                ))
            })
    }

    /// Convert an internal timestamp back to a UTC instant.
    #[must_use]
    pub fn to_utc(&self, timestamp: InternalTimestamp) -> DateTime<Utc> {
        self.reference() + TimeDelta::milliseconds(i64::from(timestamp.millis()))
    }

    /// The current time as an internal timestamp.
    pub fn now(&self) -> Result<InternalTimestamp> {
        self.to_internal(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn eastern_clock() -> InternalClock {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        InternalClock::from_offset_minutes(day, -300).unwrap()
    }

    #[test]
    fn market_open_is_nine_thirty_in_millis() {
        let clock = eastern_clock();
        let open = Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap();

        let ts = clock.to_internal(open).unwrap();

        assert_eq!(ts.millis(), 34_200_000);
        assert_eq!(clock.to_utc(ts), open);
    }

    #[test]
    fn time_of_day_conversion_matches_clock() {
        let time = NaiveTime::from_hms_milli_opt(9, 30, 0, 250).unwrap();
        assert_eq!(InternalTimestamp::from_time_of_day(time).millis(), 34_200_250);
    }

    #[test]
    fn instants_far_from_reference_are_rejected() {
        let clock = eastern_clock();
        let far = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        assert!(matches!(
            clock.to_internal(far),
            Err(MarketDataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn offset_out_of_range_is_rejected() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert!(InternalClock::from_offset_minutes(day, 24 * 60).is_err());
    }
}
