//! Split events and their problem log.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MarketDataError, Result};

/// Relative tolerance under which two split ratios are considered equal.
pub const RATIO_TOLERANCE: f64 = 1e-6;

/// A problem observed with a split, kept for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitProblem {
    /// Day the problem was observed.
    pub date: NaiveDate,
    /// Description.
    pub text: String,
}

impl SplitProblem {
    /// Create a problem entry.
    pub fn new(date: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            date,
            text: text.into(),
        }
    }
}

/// One corporate split for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitEvent {
    /// Effective day of the split.
    pub date: NaiveDate,
    /// Symbol.
    pub symbol: String,
    /// Share-count multiplier (2.0 for a 2-for-1 split).
    pub ratio: f64,
    /// Whether the event is trusted for count correction.
    pub usable: bool,
    /// Problems observed with this event.
    pub problems: Vec<SplitProblem>,
    /// Day the entry last changed.
    pub last_update: NaiveDate,
}

impl SplitEvent {
    /// Create a usable event with no problems, last updated today.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the symbol is blank or the ratio is not a
    /// finite positive number.
    pub fn new(date: NaiveDate, symbol: impl AsRef<str>, ratio: f64) -> Result<Self> {
        let symbol = symbol.as_ref().trim();
        if symbol.is_empty() {
            return Err(MarketDataError::invalid_argument("split symbol may not be blank"));
        }
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(MarketDataError::invalid_argument(format!(
                "[{symbol}] split ratio must be positive, got {ratio}"
            )));
        }
        Ok(Self {
            date,
            symbol: symbol.to_string(),
            ratio,
            usable: true,
            problems: Vec::new(),
            last_update: Utc::now().date_naive(),
        })
    }

    /// Set the usable flag.
    #[must_use]
    pub const fn with_usable(mut self, usable: bool) -> Self {
        self.usable = usable;
        self
    }

    /// Append a problem.
    #[must_use]
    pub fn with_problem(mut self, date: NaiveDate, text: impl Into<String>) -> Self {
        self.problems.push(SplitProblem::new(date, text));
        self
    }

    /// Set the last update day.
    #[must_use]
    pub const fn with_last_update(mut self, last_update: NaiveDate) -> Self {
        self.last_update = last_update;
        self
    }

    /// Whether `ratio` equals this event's ratio within [`RATIO_TOLERANCE`].
    #[must_use]
    pub fn ratio_matches(&self, ratio: f64) -> bool {
        (self.ratio - ratio).abs() <= RATIO_TOLERANCE * self.ratio.abs().max(ratio.abs())
    }

    /// Same symbol, same day and matching ratio.
    #[must_use]
    pub fn is_same_split(&self, other: &Self) -> bool {
        self.symbol == other.symbol && self.date == other.date && self.ratio_matches(other.ratio)
    }
}

impl fmt::Display for SplitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ratio={}{}",
            self.date,
            self.symbol,
            self.ratio,
            if self.usable { "" } else { " (unusable)" }
        )
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 6, 9).unwrap()
    }

    #[test]
    fn new_event_is_usable_and_trimmed() {
        let event = SplitEvent::new(day(), " AAPL ", 7.0).unwrap();

        assert_eq!(event.symbol, "AAPL");
        assert!(event.usable);
        assert!(event.problems.is_empty());
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-2.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    fn bad_ratio_is_rejected(ratio: f64) {
        assert!(matches!(
            SplitEvent::new(day(), "AAPL", ratio),
            Err(MarketDataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn blank_symbol_is_rejected() {
        assert!(SplitEvent::new(day(), "  ", 2.0).is_err());
    }

    #[test_case(2.0, 2.000_001, true ; "within relative tolerance")]
    #[test_case(2.0, 2.0001, false ; "outside tolerance")]
    #[test_case(1_000.0, 1_000.000_5, true ; "large ratio scales tolerance")]
    #[test_case(0.001, 0.001_01, false ; "small ratio scales tolerance")]
    fn ratio_comparison_is_relative(a: f64, b: f64, expected: bool) {
        let event = SplitEvent::new(day(), "AAPL", a).unwrap();
        assert_eq!(event.ratio_matches(b), expected);
    }

    #[test]
    fn same_split_requires_same_day_and_symbol() {
        let a = SplitEvent::new(day(), "AAPL", 2.0).unwrap();
        let b = SplitEvent::new(day().succ_opt().unwrap(), "AAPL", 2.0).unwrap();
        let c = SplitEvent::new(day(), "MSFT", 2.0).unwrap();

        assert!(a.is_same_split(&a.clone().with_usable(false)));
        assert!(!a.is_same_split(&b));
        assert!(!a.is_same_split(&c));
    }
}
