//! Fixed-capacity, time-slot-indexed bar buffer for one symbol.
//!
//! Slot `i` covers `[start + i * granularity, start + (i + 1) * granularity)`.
//! A slot either holds a bar or is empty; the buffer does not distinguish a
//! slot that was never written from one explicitly cleared.

use tracing::debug;

use crate::bars::{Bar, OhlcvBar};
use crate::domain::InternalTimestamp;
use crate::error::{MarketDataError, Result};

/// Per-symbol chart of bars.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolChart<B = Bar> {
    symbol: String,
    start: InternalTimestamp,
    end: InternalTimestamp,
    granularity_ms: i32,
    bars: Vec<Option<B>>,
    highest_set_index: Option<usize>,
    non_null_count: usize,
}

impl<B: OhlcvBar> SymbolChart<B> {
    /// Create an empty chart with `floor((end - start) / granularity)` slots.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the granularity is not positive or there is
    /// no room for a single slot.
    pub fn new(
        symbol: impl Into<String>,
        start: InternalTimestamp,
        end: InternalTimestamp,
        granularity_ms: i32,
    ) -> Result<Self> {
        let symbol = symbol.into();
        if granularity_ms <= 0 {
            return Err(MarketDataError::invalid_argument(format!(
                "[{symbol}] granularity must be positive, got {granularity_ms}ms"
            )));
        }

        let span = i64::from(end.millis()) - i64::from(start.millis());
        if span < i64::from(granularity_ms) {
            return Err(MarketDataError::invalid_argument(format!(
                "[{symbol}] no room for a single {granularity_ms}ms slot between {start} and {end}"
            )));
        }

        let capacity = usize::try_from(span / i64::from(granularity_ms)).map_err(|_| {
            MarketDataError::invalid_argument(format!("[{symbol}] chart capacity out of range"))
        })?;
        debug!(symbol = %symbol, capacity, granularity_ms, "chart created");

        Ok(Self {
            symbol,
            start,
            end,
            granularity_ms,
            bars: std::iter::repeat_with(|| None).take(capacity).collect(),
            highest_set_index: None,
            non_null_count: 0,
        })
    }

    /// Append a bar after the highest set slot.
    ///
    /// Assumes gap-free appends; use [`Self::set_bar`] to leave gaps.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the chart is full.
    pub fn add_bar(&mut self, bar: B) -> Result<usize> {
        let index = self.highest_set_index.map_or(0, |highest| highest + 1);
        self.set_bar(Some(bar), index)?;
        Ok(index)
    }

    /// Place a bar, or clear a slot with `None`.
    ///
    /// The highest set index follows `index` even when clearing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `index` is not below the capacity.
    pub fn set_bar(&mut self, bar: Option<B>, index: usize) -> Result<()> {
        let capacity = self.capacity();
        let slot = self.bars.get_mut(index).ok_or_else(|| {
            MarketDataError::invalid_argument(format!(
                "[{}] slot {index} is beyond capacity {capacity}",
                self.symbol
            ))
        })?;

        let added = bar.is_some();
        let removed = std::mem::replace(slot, bar).is_some();
        match (removed, added) {
            (false, true) => self.non_null_count += 1,
            (true, false) => self.non_null_count -= 1,
            _ => {}
        }

        if self.highest_set_index.is_none_or(|highest| index > highest) {
            self.highest_set_index = Some(index);
        }
        Ok(())
    }

    /// Bar at `index`, or `None` when out of range or empty.
    #[must_use]
    pub fn get_bar(&self, index: usize) -> Option<&B> {
        self.bars.get(index).and_then(Option::as_ref)
    }

    /// Mutable access to the bar at `index`.
    pub fn get_bar_mut(&mut self, index: usize) -> Option<&mut B> {
        self.bars.get_mut(index).and_then(Option::as_mut)
    }

    /// Highest set slot plus one; interior empty slots are counted.
    #[must_use]
    pub fn size(&self) -> usize {
        self.highest_set_index.map_or(0, |highest| highest + 1)
    }

    /// Whether at least one slot holds a bar.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.highest_set_index.is_some() && self.non_null_count > 0
    }

    /// Highest slot written so far.
    #[must_use]
    pub const fn highest_set_index(&self) -> Option<usize> {
        self.highest_set_index
    }

    /// Number of slots holding a bar.
    #[must_use]
    pub const fn non_null_count(&self) -> usize {
        self.non_null_count
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bars.len()
    }

    /// Symbol this chart belongs to.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Inclusive start of the first slot.
    #[must_use]
    pub const fn start(&self) -> InternalTimestamp {
        self.start
    }

    /// End of the charted period as requested at construction.
    #[must_use]
    pub const fn end(&self) -> InternalTimestamp {
        self.end
    }

    /// Slot width in milliseconds.
    #[must_use]
    pub const fn granularity_ms(&self) -> i32 {
        self.granularity_ms
    }

    /// Slot covering `timestamp`, if any.
    #[must_use]
    pub fn slot_of(&self, timestamp: InternalTimestamp) -> Option<usize> {
        let offset = i64::from(timestamp.millis()) - i64::from(self.start.millis());
        if offset < 0 {
            return None;
        }
        let index = usize::try_from(offset / i64::from(self.granularity_ms)).ok()?;
        (index < self.capacity()).then_some(index)
    }

    /// Start timestamp of slot `index`, if in range.
    #[must_use]
    pub fn slot_start(&self, index: usize) -> Option<InternalTimestamp> {
        if index >= self.capacity() {
            return None;
        }
        let offset = i64::try_from(index).ok()? * i64::from(self.granularity_ms);
        let millis = i32::try_from(i64::from(self.start.millis()) + offset).ok()?;
        Some(InternalTimestamp::from_millis(millis))
    }

    /// Present bars with their slot index, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &B)> {
        self.bars
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|bar| (index, bar)))
    }

    /// Same geometry and occupancy with every present bar converted by `f`.
    pub fn map<C, F>(&self, mut f: F) -> SymbolChart<C>
    where
        F: FnMut(&B) -> C,
    {
        SymbolChart {
            symbol: self.symbol.clone(),
            start: self.start,
            end: self.end,
            granularity_ms: self.granularity_ms,
            bars: self
                .bars
                .iter()
                .map(|slot| slot.as_ref().map(&mut f))
                .collect(),
            highest_set_index: self.highest_set_index,
            non_null_count: self.non_null_count,
        }
    }

    /// Check the bookkeeping against the slots.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the non-null count or the highest set index
    /// disagrees with the stored bars.
    pub fn validate(&self) -> Result<()> {
        let present = self.bars.iter().filter(|slot| slot.is_some()).count();
        if present != self.non_null_count {
            return Err(MarketDataError::invalid_state(format!(
                "[{}] non-null count {} but {present} bars present",
                self.symbol, self.non_null_count
            )));
        }

        if let Some(last) = self.bars.iter().rposition(Option::is_some) {
            if self.highest_set_index.is_none_or(|highest| last > highest) {
                return Err(MarketDataError::invalid_state(format!(
                    "[{}] bar at slot {last} beyond highest set index {:?}",
                    self.symbol, self.highest_set_index
                )));
            }
        }
        if self
            .highest_set_index
            .is_some_and(|highest| highest >= self.capacity())
        {
            return Err(MarketDataError::invalid_state(format!(
                "[{}] highest set index beyond capacity {}",
                self.symbol,
                self.capacity()
            )));
        }
        Ok(())
    }
}
