//! Error handling for the market data core.
//!
//! A single error enum is shared by the codec, the bar state machine, the
//! symbol chart, the split ledger and the historical data adapters.
//!
//! | Code | Usage |
//! |------|-------|
//! | `MISSING_SYMBOL` | Dictionary lookup failed during encode/decode |
//! | `INVALID_ARGUMENT` | Malformed row, bad buffer length, out-of-range field, bar invariant, chart geometry |
//! | `INVALID_STATE` | A validation pass found a ledger or chart inconsistent |
//! | `TIMEOUT` | A historical source call exceeded its deadline |
//! | `UNAVAILABLE` | A historical source failed transiently |
//! | `IO` | Batch persistence failed |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes for the market data core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Symbol or symbol code not present in the dictionary.
    MissingSymbol,
    /// Invalid input value.
    InvalidArgument,
    /// Internal inconsistency detected by a validation pass.
    InvalidState,
    /// Deadline exceeded.
    Timeout,
    /// Transient upstream failure.
    Unavailable,
    /// File or CSV failure.
    Io,
}

impl ErrorCode {
    /// Get the error reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingSymbol => "MISSING_SYMBOL",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidState => "INVALID_STATE",
            Self::Timeout => "TIMEOUT",
            Self::Unavailable => "UNAVAILABLE",
            Self::Io => "IO",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Market data errors.
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// Dictionary lookup failure.
    #[error("[{symbol}] missing symbol: {detail}")]
    MissingSymbol {
        /// Symbol name, or the numeric code when decoding.
        symbol: String,
        /// Additional details.
        detail: String,
    },

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal inconsistency found by a validation pass.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Operation timed out.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
        /// Deadline that was exceeded.
        after: Duration,
    },

    /// Upstream source temporarily unavailable.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl MarketDataError {
    /// Create a missing symbol error.
    pub fn missing_symbol(symbol: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MissingSymbol {
            symbol: symbol.into(),
            detail: detail.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Get the stable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingSymbol { .. } => ErrorCode::MissingSymbol,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::InvalidState(_) => ErrorCode::InvalidState,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Unavailable(_) => ErrorCode::Unavailable,
            Self::Io(_) | Self::Csv(_) => ErrorCode::Io,
        }
    }

    /// Whether a retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable(_))
    }
}

/// Result alias for market data operations.
pub type Result<T, E = MarketDataError> = std::result::Result<T, E>;
