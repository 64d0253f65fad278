//! Stock-split ledger.
//!
//! Keeps a date-sorted list of [`SplitEvent`]s per symbol and projects share
//! counts across split boundaries with [`SplitLedger::correct_stock_count`].
//! The ledger is persisted as CSV in batch (startup, shutdown or an explicit
//! snapshot); nothing here runs on the per-tick path.

mod event;
mod ledger;
mod persistence;

pub use event::{RATIO_TOLERANCE, SplitEvent, SplitProblem};
pub use ledger::{SplitAddOutcome, SplitLedger};
pub use persistence::{
    DATE_FORMAT, HEADER, format_date, format_problems, parse_date, parse_problems,
};
