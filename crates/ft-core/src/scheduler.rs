//! Cooperative interval scheduler with suspension catch-up.
//!
//! The scheduler never spawns threads or timers of its own. The host calls
//! [`IntervalScheduler::poll`] from its event loop and every schedule whose deadline
//! has passed fires. While suspended nothing fires; on
//! [`IntervalScheduler::resume`] each schedule is invoked `floor(elapsed / period)`
//! times synchronously and its phase restarts from the resume instant.
//!
//! Callbacks receive a mutable context `T` owned by the caller, so a tick can mutate
//! engine state without shared ownership, together with the instant the tick stands
//! for. A real tick carries its deadline; a synthesized tick carries the point in
//! the suspended interval where it would have fired. A failing callback is isolated: the error
//! is collected into the returned [`TickReport`] and the loop carries on.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::types::ValidationError;

/// Error type returned by tick callbacks.
pub type TickError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by tick callbacks.
pub type TickResult = Result<(), TickError>;

type Callback<T> = Box<dyn FnMut(&mut T, DateTime<Utc>) -> TickResult>;

/// Identifies a running schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(u64);

/// A callback invocation that returned an error.
#[derive(Debug)]
pub struct TickFailure {
    pub handle: ScheduleHandle,
    /// Whether the failing invocation was synthesized during catch-up.
    pub catch_up: bool,
    pub error: TickError,
}

/// Outcome of a [`poll`](IntervalScheduler::poll) or [`resume`](IntervalScheduler::resume).
#[derive(Debug, Default)]
pub struct TickReport {
    /// Invocations made for deadlines that passed in real time.
    pub fired: usize,
    /// Invocations synthesized for ticks missed during suspension.
    pub synthesized: usize,
    pub failures: Vec<TickFailure>,
}

impl TickReport {
    pub const fn total(&self) -> usize {
        self.fired + self.synthesized
    }

    fn merge(&mut self, other: Self) {
        self.fired += other.fired;
        self.synthesized += other.synthesized;
        self.failures.extend(other.failures);
    }
}

struct Schedule<T> {
    handle: ScheduleHandle,
    period_ms: i64,
    next_due: DateTime<Utc>,
    callback: Callback<T>,
}

impl<T> Schedule<T> {
    fn fire(
        &mut self,
        ctx: &mut T,
        at: DateTime<Utc>,
        catch_up: bool,
        report: &mut TickReport,
    ) {
        if catch_up {
            report.synthesized += 1;
        } else {
            report.fired += 1;
        }
        if let Err(error) = (self.callback)(ctx, at) {
            tracing::warn!(handle = self.handle.0, catch_up, %error, "tick callback failed");
            report.failures.push(TickFailure {
                handle: self.handle,
                catch_up,
                error,
            });
        }
    }
}

/// Runs periodic callbacks while the process is in the foreground.
pub struct IntervalScheduler<T> {
    clock: Arc<dyn Clock>,
    schedules: Vec<Schedule<T>>,
    next_handle: u64,
    suspended: bool,
}

impl<T> IntervalScheduler<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            schedules: Vec::new(),
            next_handle: 0,
            suspended: false,
        }
    }

    /// Starts invoking `callback` every `period_ms` milliseconds.
    ///
    /// The first invocation is due one full period from now.
    pub fn start<F>(&mut self, period_ms: i64, callback: F) -> Result<ScheduleHandle, ValidationError>
    where
        F: FnMut(&mut T, DateTime<Utc>) -> TickResult + 'static,
    {
        if period_ms <= 0 {
            return Err(ValidationError::NonPositiveDuration {
                field: "tick period",
                value: period_ms,
            });
        }
        self.next_handle += 1;
        let handle = ScheduleHandle(self.next_handle);
        self.schedules.push(Schedule {
            handle,
            period_ms,
            next_due: self.clock.now() + Duration::milliseconds(period_ms),
            callback: Box::new(callback),
        });
        tracing::debug!(handle = handle.0, period_ms, "schedule started");
        Ok(handle)
    }

    /// Cancels a schedule. Returns `false` if the handle was not active.
    pub fn stop(&mut self, handle: ScheduleHandle) -> bool {
        let before = self.schedules.len();
        self.schedules.retain(|s| s.handle != handle);
        let removed = self.schedules.len() != before;
        if removed {
            tracing::debug!(handle = handle.0, "schedule stopped");
        }
        removed
    }

    pub fn is_active(&self, handle: ScheduleHandle) -> bool {
        self.schedules.iter().any(|s| s.handle == handle)
    }

    pub const fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Next deadline of a schedule, if active.
    pub fn next_due(&self, handle: ScheduleHandle) -> Option<DateTime<Utc>> {
        self.schedules
            .iter()
            .find(|s| s.handle == handle)
            .map(|s| s.next_due)
    }

    /// Earliest deadline across all schedules.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.schedules.iter().map(|s| s.next_due).min()
    }

    /// Stops real-time ticks until [`resume`](Self::resume).
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Fires every tick whose deadline is at or before the current time.
    ///
    /// Does nothing while suspended.
    pub fn poll(&mut self, ctx: &mut T) -> TickReport {
        let mut report = TickReport::default();
        if self.suspended {
            return report;
        }
        let now = self.clock.now();
        for schedule in &mut self.schedules {
            while schedule.next_due <= now {
                let due = schedule.next_due;
                schedule.fire(ctx, due, false, &mut report);
                schedule.next_due += Duration::milliseconds(schedule.period_ms);
            }
        }
        report
    }

    /// Leaves suspension, synthesizing the ticks missed during `elapsed_ms`.
    ///
    /// Each schedule fires `floor(elapsed_ms / period)` times before this returns,
    /// at instants one period apart starting one period after the suspension
    /// began. Its next real tick is then due one full period after now.
    pub fn resume(&mut self, elapsed_ms: i64, ctx: &mut T) -> TickReport {
        self.suspended = false;
        let now = self.clock.now();
        let elapsed_ms = elapsed_ms.max(0);
        let suspended_at = now - Duration::milliseconds(elapsed_ms);
        let mut report = TickReport::default();
        for schedule in &mut self.schedules {
            let missed = elapsed_ms / schedule.period_ms;
            let mut partial = TickReport::default();
            for k in 1..=missed {
                let at = suspended_at + Duration::milliseconds(k * schedule.period_ms);
                schedule.fire(ctx, at, true, &mut partial);
            }
            schedule.next_due = now + Duration::milliseconds(schedule.period_ms);
            tracing::debug!(
                handle = schedule.handle.0,
                synthesized = partial.synthesized,
                "caught up after suspension"
            );
            report.merge(partial);
        }
        report
    }
}
