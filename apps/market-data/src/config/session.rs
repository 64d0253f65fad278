//! Trading session configuration.

use chrono::{FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::domain::{InternalClock, InternalTimestamp};
use crate::ingest::SessionWindow;

/// Charted session and exchange clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Exchange-local session start (`HH:MM:SS`).
    #[serde(default = "default_start")]
    pub start: NaiveTime,
    /// Exchange-local session end (`HH:MM:SS`).
    #[serde(default = "default_end")]
    pub end: NaiveTime,
    /// Bar width in milliseconds.
    #[serde(default = "default_granularity_ms")]
    pub granularity_ms: i32,
    /// Exchange offset from UTC in minutes (east positive).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Trading day; today in exchange time when omitted.
    #[serde(default)]
    pub trading_day: Option<NaiveDate>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            end: default_end(),
            granularity_ms: default_granularity_ms(),
            utc_offset_minutes: default_utc_offset_minutes(),
            trading_day: None,
        }
    }
}

impl SessionConfig {
    /// Session window in internal timestamps.
    #[must_use]
    pub fn window(&self) -> SessionWindow {
        SessionWindow::new(
            InternalTimestamp::from_time_of_day(self.start),
            InternalTimestamp::from_time_of_day(self.end),
            self.granularity_ms,
        )
    }

    /// Exchange UTC offset.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the offset is a day or more.
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "session.utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }

    /// Clock for the configured (or current) trading day.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the offset is invalid.
    pub fn clock(&self) -> Result<InternalClock, ConfigError> {
        let offset = self.utc_offset()?;
        let day = self
            .trading_day
            .unwrap_or_else(|| Utc::now().with_timezone(&offset).date_naive());
        Ok(InternalClock::new(day, offset))
    }
}

fn default_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN)
}

fn default_end() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN)
}

const fn default_granularity_ms() -> i32 {
    60_000
}

const fn default_utc_offset_minutes() -> i32 {
    -300
}
