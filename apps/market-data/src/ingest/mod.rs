//! Tick ingestion: slot routing, per-symbol writers and record replay.
//!
//! ```text
//! TickRecord -> decode -> per-symbol channel -> SymbolIngestor -> SymbolChart<CumulativeBar>
//! ```

mod replay;
mod service;
mod symbol;

pub use replay::{read_replay_file, write_replay_file};
pub use service::{DEFAULT_CHANNEL_CAPACITY, IngestService};
pub use symbol::{IngestOutcome, SymbolIngestor};

use crate::domain::InternalTimestamp;

/// Charted period and slot width shared by every symbol of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    /// Start of the first slot.
    pub start: InternalTimestamp,
    /// End of the session.
    pub end: InternalTimestamp,
    /// Slot width in milliseconds.
    pub granularity_ms: i32,
}

impl SessionWindow {
    /// Create a session window.
    #[must_use]
    pub const fn new(
        start: InternalTimestamp,
        end: InternalTimestamp,
        granularity_ms: i32,
    ) -> Self {
        Self {
            start,
            end,
            granularity_ms,
        }
    }
}
