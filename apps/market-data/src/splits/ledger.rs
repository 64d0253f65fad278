//! In-memory split ledger.
//!
//! Per-symbol lists are replaced atomically: writers clone the current list,
//! modify the copy and swap the `Arc`, so a reader holding a snapshot never
//! observes a partially sorted list.

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::event::{SplitEvent, SplitProblem};
use crate::error::{MarketDataError, Result};
use crate::observability::record_split_conflict;

/// What [`SplitLedger::add`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAddOutcome {
    /// A new entry was stored.
    Inserted,
    /// Merged into an existing entry with the same day and ratio.
    Merged,
    /// An entry for the same day had a different ratio; it is now unusable.
    Conflict,
}

/// Split history for many symbols.
#[derive(Debug, Default)]
pub struct SplitLedger {
    entries: RwLock<HashMap<String, Arc<Vec<SplitEvent>>>>,
    save_to: Option<PathBuf>,
}

impl SplitLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ledger from CSV; later [`Self::save`] calls write back to `path`.
    ///
    /// # Errors
    ///
    /// Returns `Io`/`Csv` on read failure and `InvalidArgument` on a bad
    /// header or malformed row.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut ledger = Self::new();
        for event in super::persistence::read_events(path)? {
            ledger.add(event);
        }
        ledger.save_to = Some(path.to_path_buf());
        debug!(path = %path.display(), size = ledger.size(), "split ledger loaded");
        Ok(ledger)
    }

    /// Write the ledger to `path` as CSV, symbols in sorted order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the parent directory does not exist and
    /// `Io`/`Csv` on write failure.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.snapshot();
        super::persistence::write_events(
            path.as_ref(),
            snapshot.iter().flat_map(|list| list.iter()),
        )
    }

    /// Write the ledger back to its default location.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if no location is known, otherwise as [`Self::save_to`].
    pub fn save(&self) -> Result<()> {
        let path = self.save_to.as_deref().ok_or_else(|| {
            MarketDataError::invalid_state("split ledger has no default save location")
        })?;
        self.save_to(path)
    }

    /// Set the default save location.
    pub fn set_save_to(&mut self, path: impl Into<PathBuf>) {
        self.save_to = Some(path.into());
    }

    /// The default save location, if any.
    #[must_use]
    pub fn default_save_to(&self) -> Option<&Path> {
        self.save_to.as_deref()
    }

    /// Add an event.
    ///
    /// - Same day, matching ratio: problems are merged, usability is the AND of
    ///   both, and the last update is refreshed.
    /// - Same day, different ratio: the stored entry becomes unusable and gets
    ///   a problem naming both ratios.
    /// - Otherwise the event is inserted in date order.
    ///
    /// Conflicts are recorded rather than raised so the ledger stays queryable.
    pub fn add(&self, event: SplitEvent) -> SplitAddOutcome {
        let today = Utc::now().date_naive();
        let symbol = event.symbol.clone();
        let mut entries = self.entries.write();
        let mut list: Vec<SplitEvent> = entries
            .get(&symbol)
            .map(|current| current.as_ref().clone())
            .unwrap_or_default();

        let outcome = if let Some(existing) = list.iter_mut().find(|e| e.date == event.date) {
            if existing.ratio_matches(event.ratio) {
                existing.problems.extend(event.problems);
                existing.usable &= event.usable;
                existing.last_update = today;
                SplitAddOutcome::Merged
            } else {
                warn!(
                    symbol = %symbol,
                    date = %event.date,
                    existing = existing.ratio,
                    observed = event.ratio,
                    "conflicting split ratios, marking split unusable"
                );
                record_split_conflict(&symbol);
                existing.usable = false;
                existing.problems.push(SplitProblem::new(
                    today,
                    format!(
                        "observed two different ratios for the same split: {} and the new {}",
                        existing.ratio, event.ratio
                    ),
                ));
                existing.last_update = today;
                SplitAddOutcome::Conflict
            }
        } else {
            list.push(event);
            list.sort_by_key(|e| e.date);
            list.dedup_by(|later, earlier| earlier.is_same_split(later));
            SplitAddOutcome::Inserted
        };

        entries.insert(symbol, Arc::new(list));
        outcome
    }

    /// Total number of events.
    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.read().values().map(|list| list.len()).sum()
    }

    /// Symbols with at least one event, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.entries.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Snapshot of a symbol's events in date order.
    #[must_use]
    pub fn events(&self, symbol: &str) -> Option<Arc<Vec<SplitEvent>>> {
        self.entries.read().get(symbol).cloned()
    }

    /// The split effective on `day`.
    #[must_use]
    pub fn get(&self, symbol: &str, day: NaiveDate) -> Option<SplitEvent> {
        self.events(symbol)?.iter().find(|e| e.date == day).cloned()
    }

    /// The earliest split within the inclusive range between `from` and `to`.
    #[must_use]
    pub fn get_first_split_between(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Option<SplitEvent> {
        let (first, last) = if from <= to { (from, to) } else { (to, from) };
        self.events(symbol)?
            .iter()
            .find(|e| e.date >= first && e.date <= last)
            .cloned()
    }

    /// Project a share count known on `known` to `target`.
    ///
    /// Every split within the inclusive range between the two days applies:
    /// moving forward divides by the ratio, moving backward multiplies. The
    /// result is rounded to the nearest share.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn correct_stock_count(
        &self,
        count: i64,
        symbol: &str,
        target: NaiveDate,
        known: NaiveDate,
    ) -> i64 {
        if target == known {
            return count;
        }
        let Some(events) = self.events(symbol) else {
            return count;
        };

        let forward = target > known;
        let (first, last) = if forward { (known, target) } else { (target, known) };

        let mut result = count as f64;
        for event in events.iter().filter(|e| e.date >= first && e.date <= last) {
            if forward {
                result /= event.ratio;
            } else {
                result *= event.ratio;
            }
        }
        result.round() as i64
    }

    /// Check that every list is sorted, unique by day and has positive ratios.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` describing the first inconsistency.
    pub fn validate(&self) -> Result<()> {
        for (symbol, list) in self.entries.read().iter() {
            if let Some(pair) = list.windows(2).find(|pair| pair[0].date >= pair[1].date) {
                return Err(MarketDataError::invalid_state(format!(
                    "[{symbol}] splits out of order or duplicated: {} then {}",
                    pair[0].date, pair[1].date
                )));
            }
            let invalid = list
                .iter()
                .find(|e| e.ratio.is_nan() || e.ratio <= 0.0 || &e.symbol != symbol);
            if let Some(event) = invalid {
                return Err(MarketDataError::invalid_state(format!(
                    "[{symbol}] invalid split entry: {event}"
                )));
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<Arc<Vec<SplitEvent>>> {
        let entries = self.entries.read();
        let mut symbols: Vec<&String> = entries.keys().collect();
        symbols.sort();
        symbols
            .into_iter()
            .filter_map(|symbol| entries.get(symbol).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn split(date: NaiveDate, ratio: f64) -> SplitEvent {
        SplitEvent::new(date, "AAPL", ratio).unwrap()
    }

    #[test]
    fn insert_keeps_lists_sorted() {
        let ledger = SplitLedger::new();
        ledger.add(split(day(2020, 8, 31), 4.0));
        ledger.add(split(day(2014, 6, 9), 7.0));
        ledger.add(split(day(2005, 2, 28), 2.0));

        let events = ledger.events("AAPL").unwrap();
        let dates: Vec<_> = events.iter().map(|e| e.date).collect();

        assert_eq!(dates, vec![day(2005, 2, 28), day(2014, 6, 9), day(2020, 8, 31)]);
        assert_eq!(ledger.size(), 3);
        ledger.validate().unwrap();
    }

    #[test]
    fn inserting_twice_does_not_duplicate() {
        let ledger = SplitLedger::new();
        let event = split(day(2014, 6, 9), 7.0);

        assert_eq!(ledger.add(event.clone()), SplitAddOutcome::Inserted);
        assert_eq!(ledger.add(event), SplitAddOutcome::Merged);

        assert_eq!(ledger.size(), 1);
        assert!(ledger.get("AAPL", day(2014, 6, 9)).unwrap().usable);
    }

    #[test]
    fn merge_combines_problems_and_usability() {
        let ledger = SplitLedger::new();
        let stale = day(2000, 1, 1);
        ledger.add(
            split(day(2014, 6, 9), 7.0)
                .with_problem(stale, "first")
                .with_last_update(stale),
        );

        ledger.add(
            split(day(2014, 6, 9), 7.000_000_1)
                .with_usable(false)
                .with_problem(stale, "second"),
        );

        let merged = ledger.get("AAPL", day(2014, 6, 9)).unwrap();
        assert!(!merged.usable);
        assert_eq!(merged.problems.len(), 2);
        assert!(merged.last_update > stale);
    }

    #[test]
    fn conflicting_ratio_marks_entry_unusable() {
        let ledger = SplitLedger::new();
        ledger.add(split(day(2014, 6, 9), 7.0));

        assert_eq!(ledger.add(split(day(2014, 6, 9), 2.0)), SplitAddOutcome::Conflict);

        let entry = ledger.get("AAPL", day(2014, 6, 9)).unwrap();
        assert_eq!(ledger.size(), 1);
        assert!(!entry.usable);
        assert!((entry.ratio - 7.0).abs() < f64::EPSILON);
        assert!(entry.problems[0].text.contains("7 and the new 2"));
    }

    #[test]
    fn lookups_by_day_and_range() {
        let ledger = SplitLedger::new();
        ledger.add(split(day(2014, 6, 9), 7.0));
        ledger.add(split(day(2020, 8, 31), 4.0));

        assert!(ledger.get("AAPL", day(2014, 6, 10)).is_none());
        assert!(ledger.get("MSFT", day(2014, 6, 9)).is_none());

        let first = ledger
            .get_first_split_between("AAPL", day(2021, 1, 1), day(2010, 1, 1))
            .unwrap();
        assert_eq!(first.date, day(2014, 6, 9));
        assert!(
            ledger
                .get_first_split_between("AAPL", day(2015, 1, 1), day(2020, 8, 30))
                .is_none()
        );
        assert_eq!(
            ledger
                .get_first_split_between("AAPL", day(2020, 8, 31), day(2020, 8, 31))
                .map(|e| e.date),
            Some(day(2020, 8, 31))
        );
    }

    #[test]
    fn two_for_one_forward_is_reciprocal_of_backward() {
        let ledger = SplitLedger::new();
        ledger.add(split(day(2020, 8, 31), 2.0));
        let before = day(2020, 8, 1);
        let after = day(2020, 9, 30);

        let forward = ledger.correct_stock_count(1_000, "AAPL", after, before);
        let backward = ledger.correct_stock_count(forward, "AAPL", before, after);

        assert_eq!(forward, 500);
        assert_eq!(backward, 1_000);
        assert_eq!(ledger.correct_stock_count(1_000, "AAPL", before, after), 2_000);
    }

    #[test]
    fn same_day_or_unknown_symbol_leaves_count_unchanged() {
        let ledger = SplitLedger::new();
        ledger.add(split(day(2020, 8, 31), 4.0));

        assert_eq!(
            ledger.correct_stock_count(123, "AAPL", day(2020, 8, 31), day(2020, 8, 31)),
            123
        );
        assert_eq!(
            ledger.correct_stock_count(123, "MSFT", day(2021, 1, 1), day(2019, 1, 1)),
            123
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let ledger = SplitLedger::new();
        ledger.add(split(day(2020, 8, 31), 4.0));

        assert_eq!(
            ledger.correct_stock_count(400, "AAPL", day(2020, 9, 1), day(2020, 8, 31)),
            100
        );
        assert_eq!(
            ledger.correct_stock_count(100, "AAPL", day(2020, 8, 30), day(2020, 8, 31)),
            400
        );
    }

    #[test]
    fn save_without_location_fails() {
        assert!(matches!(
            SplitLedger::new().save(),
            Err(MarketDataError::InvalidState(_))
        ));
    }

    #[test]
    fn readers_never_see_unsorted_lists() {
        let ledger = SplitLedger::new();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for offset in (0..200).rev() {
                    let date = day(2000, 1, 1) + chrono::Days::new(offset);
                    ledger.add(split(date, 2.0));
                }
            });
            scope.spawn(|| {
                for _ in 0..200 {
                    if let Some(events) = ledger.events("AAPL") {
                        assert!(events.windows(2).all(|w| w[0].date < w[1].date));
                    }
                }
            });
        });
        assert_eq!(ledger.size(), 200);
    }

    proptest! {
        #[test]
        fn forward_then_backward_restores_count(
            count in 0_i64..1_000_000,
            ratios in prop::collection::vec(prop::sample::select(vec![2.0, 3.0, 4.0, 5.0, 7.0, 10.0]), 0..4),
        ) {
            let ledger = SplitLedger::new();
            for (offset, ratio) in ratios.iter().enumerate() {
                let date = day(2010, 1, 1) + chrono::Days::new(offset as u64 * 30);
                ledger.add(split(date, *ratio));
            }
            let product: f64 = ratios.iter().product();
            let known = day(2009, 1, 1);
            let target = day(2012, 1, 1);

            // A count that divides evenly is restored exactly.
            let exact = count * product as i64;
            let forward = ledger.correct_stock_count(exact, "AAPL", target, known);
            prop_assert_eq!(forward, count);
            prop_assert_eq!(ledger.correct_stock_count(forward, "AAPL", known, target), exact);

            let projected = ledger.correct_stock_count(count, "AAPL", known, target);
            prop_assert_eq!(ledger.correct_stock_count(projected, "AAPL", target, known), count);
        }
    }
}
