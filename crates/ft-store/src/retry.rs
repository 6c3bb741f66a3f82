//! Backoff bookkeeping for failed document writes.
//!
//! Retries never sleep. A failed write records when the next attempt becomes
//! allowed, and the store tries again on the next mutation, tick or flush.

use chrono::{DateTime, Duration, Utc};

/// Exponential backoff settings for durable writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Automatic retries stop after this many consecutive failures.
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: i64,
    /// Upper bound on any single delay in milliseconds.
    pub max_delay_ms: i64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th consecutive failure: `base * 2^(attempt - 1)`, capped.
    pub fn delay_ms(&self, attempt: u32) -> i64 {
        let exponent = attempt.saturating_sub(1).min(30);
        self.base_delay_ms
            .saturating_mul(1_i64 << exponent)
            .min(self.max_delay_ms)
    }
}

/// A document write that has not reached durable storage yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub failed_attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: String,
}

impl PendingWrite {
    /// Records one more failure at `now`.
    pub(crate) fn record_failure(
        previous: Option<&Self>,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
        error: String,
    ) -> Self {
        let failed_attempts = previous.map_or(0, |p| p.failed_attempts) + 1;
        Self {
            failed_attempts,
            next_attempt_at: now + Duration::milliseconds(policy.delay_ms(failed_attempts)),
            last_error: error,
        }
    }

    /// Whether an automatic retry is allowed at `now`.
    pub fn is_due(&self, policy: &RetryPolicy, now: DateTime<Utc>) -> bool {
        self.failed_attempts < policy.max_attempts && now >= self.next_attempt_at
    }
}
