//! Timeout and retry around a historical source.

use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use super::HistoricalDataSource;
use crate::bars::Bar;
use crate::chart::SymbolChart;
use crate::domain::InternalTimestamp;
use crate::error::{MarketDataError, Result};
use crate::observability::{record_historical_attempt, record_historical_failure};
use crate::splits::SplitLedger;

/// Timeout and retry settings for historical calls.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub retry_limit: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any delay.
    pub max_backoff: Duration,
    /// Growth factor between delays.
    pub backoff_multiplier: f64,
    /// Jitter as a fraction of the delay (0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_limit: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

/// Exponential backoff with jitter.
#[derive(Debug)]
pub struct BackoffCalculator {
    current_attempt: u32,
    max_attempts: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl BackoffCalculator {
    /// Create a calculator allowing `policy.retry_limit` delays.
    #[must_use]
    pub fn new(policy: &FetchPolicy) -> Self {
        Self {
            current_attempt: 0,
            max_attempts: policy.retry_limit,
            initial_backoff_ms: u64::try_from(policy.initial_backoff.as_millis())
                .unwrap_or(u64::MAX),
            max_backoff_ms: u64::try_from(policy.max_backoff.as_millis()).unwrap_or(u64::MAX),
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Next delay, or `None` once the retry limit is reached.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }

        let base_ms = self.base_backoff_ms();
        let capped_ms = self.apply_jitter(base_ms).min(self.max_backoff_ms);
        self.current_attempt += 1;

        Some(Duration::from_millis(capped_ms))
    }

    /// Delays handed out so far.
    #[must_use]
    pub const fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    fn base_backoff_ms(&self) -> u64 {
        let exponent = i32::try_from(self.current_attempt).unwrap_or(i32::MAX);
        let multiplier = self.backoff_multiplier.powi(exponent);
        let backoff = (self.initial_backoff_ms as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms)
    }

    /// Random value in `[backoff * (1 - jitter), backoff * (1 + jitter)]`.
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;
        if max <= min {
            return backoff_ms;
        }
        rand::rng().random_range(min..=max) as u64
    }
}

/// A historical source with timeout and retry applied to every call.
#[derive(Debug)]
pub struct HistoricalFetcher<S> {
    source: S,
    policy: FetchPolicy,
}

impl<S: HistoricalDataSource> HistoricalFetcher<S> {
    /// Wrap a source.
    pub const fn new(source: S, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    /// The wrapped source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The active policy.
    pub const fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Minute bars with timeout and retry.
    ///
    /// # Errors
    ///
    /// The last error once retries are exhausted, or the first non-retryable one.
    pub async fn minute_bars(
        &self,
        symbol: &str,
        from: InternalTimestamp,
        to: InternalTimestamp,
    ) -> Result<SymbolChart<Bar>> {
        self.with_retry("minute_bars", symbol, || {
            self.source.minute_bars(symbol, from, to)
        })
        .await
    }

    /// Second bars with timeout and retry.
    ///
    /// # Errors
    ///
    /// As [`Self::minute_bars`].
    pub async fn second_bars(
        &self,
        symbol: &str,
        from: InternalTimestamp,
        to: InternalTimestamp,
    ) -> Result<SymbolChart<Bar>> {
        self.with_retry("second_bars", symbol, || {
            self.source.second_bars(symbol, from, to)
        })
        .await
    }

    /// Split update with timeout and retry.
    ///
    /// # Errors
    ///
    /// As [`Self::minute_bars`].
    pub async fn update_splits_for(&self, symbol: &str, ledger: &SplitLedger) -> Result<usize> {
        self.with_retry("update_splits_for", symbol, || {
            self.source.update_splits_for(symbol, ledger)
        })
        .await
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        symbol: &str,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let source = self.source.name();
        let mut backoff = BackoffCalculator::new(&self.policy);

        loop {
            let started = Instant::now();
            let result = tokio::time::timeout(self.policy.timeout, call())
                .await
                .unwrap_or_else(|_| {
                    Err(MarketDataError::Timeout {
                        operation: format!("{source}.{operation}({symbol})"),
                        after: self.policy.timeout,
                    })
                });
            record_historical_attempt(source, operation, started.elapsed().as_secs_f64());

            let error = match result {
                Ok(value) => {
                    debug!(
                        source,
                        operation,
                        symbol,
                        attempt = backoff.current_attempt() + 1,
                        "historical call succeeded"
                    );
                    return Ok(value);
                }
                Err(error) => error,
            };
            record_historical_failure(source, operation, error.code().reason());

            if !error.is_retryable() {
                return Err(error);
            }
            let Some(delay) = backoff.next_backoff() else {
                warn!(
                    source,
                    operation,
                    symbol,
                    error = %error,
                    "historical call failed, retries exhausted"
                );
                return Err(error);
            };
            warn!(
                source,
                operation,
                symbol,
                error = %error,
                retry = backoff.current_attempt(),
                delay_ms = delay.as_millis() as u64,
                "historical call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
