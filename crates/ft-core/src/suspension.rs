//! Process suspension bookkeeping.
//!
//! The host calls [`SuspensionTracker::on_suspend`] when the process goes to the
//! background and [`SuspensionTracker::on_resume`] when it returns. The tracker only
//! reports how long the process was away; deciding what to do with that time is up
//! to the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, millis_between};

/// Records when suspension began and reports the elapsed suspended time.
pub struct SuspensionTracker {
    clock: Arc<dyn Clock>,
    suspended_at: Option<DateTime<Utc>>,
}

impl SuspensionTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            suspended_at: None,
        }
    }

    /// Marks the process as suspended now. Has no effect if already suspended.
    pub fn on_suspend(&mut self) {
        let now = self.clock.now();
        self.on_suspend_at(now);
    }

    /// Marks the process as suspended since `at`.
    ///
    /// For hosts that only notice a suspension after the fact. Has no effect if
    /// already suspended.
    pub fn on_suspend_at(&mut self, at: DateTime<Utc>) {
        if self.suspended_at.is_none() {
            tracing::debug!(suspended_at = %at, "process suspended");
            self.suspended_at = Some(at);
        }
    }

    /// Clears the suspension and returns how long it lasted in milliseconds.
    ///
    /// Returns `0` if the process was not suspended.
    pub fn on_resume(&mut self) -> i64 {
        let Some(since) = self.suspended_at.take() else {
            return 0;
        };
        let elapsed = millis_between(since, self.clock.now()).max(0);
        tracing::debug!(elapsed_ms = elapsed, "process resumed");
        elapsed
    }

    pub const fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }

    pub const fn suspended_at(&self) -> Option<DateTime<Utc>> {
        self.suspended_at
    }
}
