//! Wiring of clock, suspension tracker, scheduler, timer and store.
//!
//! [`FocusEngine`] is the single entry point hosts drive. Every call runs to
//! completion before returning, so user actions, ticks and lifecycle events can
//! never interleave.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::activity::Activity;
use crate::clock::Clock;
use crate::error::FocusError;
use crate::notify::{NotificationKind, Notifier};
use crate::scheduler::{IntervalScheduler, ScheduleHandle, TickReport, TickResult};
use crate::session::Session;
use crate::suspension::SuspensionTracker;
use crate::timer::{SessionTimer, TimerState};
use crate::types::ActivityId;

const MINUTE_MS: i64 = 60_000;

/// The store side of the engine.
///
/// Implemented by the persistent session store; the engine only needs lookups,
/// the in-progress session slot and the commit of finalized sessions.
pub trait SessionLedger {
    fn activity(&self, id: &ActivityId) -> Option<&Activity>;

    fn current_session(&self) -> Option<&Session>;

    fn set_current_session(&mut self, session: Option<Session>);

    /// Records a finalized session and clears it from the in-progress slot.
    ///
    /// The session is retained even when this returns `NotFound` for its activity.
    fn commit_session(&mut self, session: Session) -> Result<(), FocusError>;

    /// Gives the ledger a chance to retry failed durable writes.
    fn retry_pending(&mut self) {}
}

/// Tunables for [`FocusEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of the progress tick in milliseconds.
    pub tick_period_ms: i64,
    /// Active time between check-in notifications, if enabled.
    pub check_in_every_ms: Option<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1_000,
            check_in_every_ms: None,
        }
    }
}

/// Result of stopping a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub session: Session,
    /// Set when the store could not fold the session into its activity.
    pub commit_error: Option<FocusError>,
}

/// State touched by tick callbacks.
struct EngineCore<L> {
    timer: SessionTimer,
    ledger: L,
    notifier: Box<dyn Notifier>,
    check_in_every_ms: Option<i64>,
    next_check_in_ms: Option<i64>,
    ticks: u64,
}

impl<L: SessionLedger> EngineCore<L> {
    /// Runs one tick as of `at`, the instant the tick stands for.
    fn on_tick(&mut self, at: DateTime<Utc>) -> TickResult {
        self.ticks += 1;
        if !self.timer.state().is_active() {
            return Ok(());
        }
        if self.timer.poll_goal_at(at) {
            let target = self
                .timer
                .session()
                .and_then(|s| s.target_ms)
                .unwrap_or_default();
            self.notify(NotificationKind::GoalReached, target / MINUTE_MS);
        }
        if let (Some(every), Some(due)) = (self.check_in_every_ms, self.next_check_in_ms) {
            let elapsed = self.timer.elapsed_active_ms_at(at)?;
            if elapsed >= due {
                self.notify(NotificationKind::CheckIn, elapsed / MINUTE_MS);
                self.next_check_in_ms = Some(next_multiple(elapsed, every));
            }
        }
        Ok(())
    }

    fn notify(&self, kind: NotificationKind, minutes: i64) {
        let Some(session) = self.timer.session() else {
            return;
        };
        let name = self.activity_name(&session.activity_id);
        self.notifier.notify(kind, &name, minutes);
    }

    fn activity_name(&self, id: &ActivityId) -> String {
        self.ledger
            .activity(id)
            .map_or_else(|| id.to_string(), |a| a.name.clone())
    }

    fn arm_check_in(&mut self, elapsed_ms: i64) {
        self.next_check_in_ms = self
            .check_in_every_ms
            .map(|every| next_multiple(elapsed_ms, every));
    }
}

/// Smallest positive multiple of `every` strictly greater than `value`.
const fn next_multiple(value: i64, every: i64) -> i64 {
    (value / every + 1) * every
}

/// Drives a single focus session against a ledger.
pub struct FocusEngine<L: SessionLedger + 'static> {
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    tracker: SuspensionTracker,
    scheduler: IntervalScheduler<EngineCore<L>>,
    core: EngineCore<L>,
    tick_handle: Option<ScheduleHandle>,
}

impl<L: SessionLedger + 'static> FocusEngine<L> {
    /// Builds an engine, resuming any in-progress session the ledger holds.
    pub fn new(
        clock: Arc<dyn Clock>,
        ledger: L,
        notifier: Box<dyn Notifier>,
        config: EngineConfig,
    ) -> Result<Self, FocusError> {
        if config.tick_period_ms <= 0 {
            return Err(crate::types::ValidationError::NonPositiveDuration {
                field: "tick period",
                value: config.tick_period_ms,
            }
            .into());
        }
        if let Some(every) = config.check_in_every_ms {
            if every <= 0 {
                return Err(crate::types::ValidationError::NonPositiveDuration {
                    field: "check-in interval",
                    value: every,
                }
                .into());
            }
        }
        let mut engine = Self {
            tracker: SuspensionTracker::new(Arc::clone(&clock)),
            scheduler: IntervalScheduler::new(Arc::clone(&clock)),
            core: EngineCore {
                timer: SessionTimer::new(Arc::clone(&clock)),
                ledger,
                notifier,
                check_in_every_ms: config.check_in_every_ms,
                next_check_in_ms: None,
                ticks: 0,
            },
            clock,
            config,
            tick_handle: None,
        };
        engine.restore_current()?;
        Ok(engine)
    }

    fn restore_current(&mut self) -> Result<(), FocusError> {
        let Some(session) = self.core.ledger.current_session().cloned() else {
            return Ok(());
        };
        let session_id = session.id.clone();
        if let Err(err) = self.core.timer.restore(session) {
            tracing::warn!(%session_id, error = %err, "discarding unusable in-progress session");
            self.core.ledger.set_current_session(None);
            return Ok(());
        }
        let elapsed = self.core.timer.elapsed_active_ms()?;
        self.core.arm_check_in(elapsed);
        self.arm_ticks()
    }

    fn arm_ticks(&mut self) -> Result<(), FocusError> {
        if let Some(handle) = self.tick_handle.take() {
            self.scheduler.stop(handle);
        }
        let handle = self
            .scheduler
            .start(
                self.config.tick_period_ms,
                |core: &mut EngineCore<L>, at: DateTime<Utc>| core.on_tick(at),
            )?;
        self.tick_handle = Some(handle);
        Ok(())
    }

    fn disarm_ticks(&mut self) {
        if let Some(handle) = self.tick_handle.take() {
            self.scheduler.stop(handle);
        }
    }

    fn persist_current(&mut self) {
        let session = self.core.timer.session().cloned();
        self.core.ledger.set_current_session(session);
    }

    pub const fn state(&self) -> TimerState {
        self.core.timer.state()
    }

    pub const fn timer(&self) -> &SessionTimer {
        &self.core.timer
    }

    pub const fn ledger(&self) -> &L {
        &self.core.ledger
    }

    pub const fn ledger_mut(&mut self) -> &mut L {
        &mut self.core.ledger
    }

    /// Consumes the engine, returning the ledger.
    pub fn into_ledger(self) -> L {
        self.core.ledger
    }

    /// Number of tick callbacks run so far, real and synthesized.
    pub const fn ticks(&self) -> u64 {
        self.core.ticks
    }

    pub const fn is_suspended(&self) -> bool {
        self.tracker.is_suspended()
    }

    /// Earliest pending tick deadline, for hosts that sleep between polls.
    pub fn next_tick_due(&self) -> Option<DateTime<Utc>> {
        self.scheduler.next_deadline()
    }

    /// Starts a session for an existing activity.
    ///
    /// Nothing is persisted unless every step succeeds; on error the engine is
    /// left as it was.
    pub fn start(
        &mut self,
        activity_id: &ActivityId,
        target_ms: Option<i64>,
    ) -> Result<Session, FocusError> {
        if self.core.ledger.activity(activity_id).is_none() {
            return Err(FocusError::activity_not_found(activity_id.as_str()));
        }
        let session = self
            .core
            .timer
            .start(activity_id.clone(), target_ms)?
            .clone();
        if let Err(err) = self.arm_ticks() {
            self.core.timer.discard();
            return Err(err);
        }
        self.core.arm_check_in(0);
        self.core.ledger.set_current_session(Some(session.clone()));
        Ok(session)
    }

    /// Pauses the running session. Returns `Ok(false)` if it was already paused.
    pub fn pause(&mut self) -> Result<bool, FocusError> {
        let paused = self.core.timer.pause()?;
        if paused {
            self.persist_current();
        }
        Ok(paused)
    }

    /// Resumes a paused session. Returns `false` if nothing was paused.
    pub fn resume(&mut self) -> bool {
        let resumed = self.core.timer.resume();
        if resumed {
            self.persist_current();
        }
        resumed
    }

    /// Stops the session and hands it to the ledger.
    ///
    /// A commit failure does not undo the stop: the finalized session is returned
    /// together with the error.
    pub fn stop(&mut self) -> Result<Completion, FocusError> {
        let session = self.core.timer.stop()?;
        self.disarm_ticks();

        let commit_error = self.core.ledger.commit_session(session.clone()).err();
        if let Some(err) = &commit_error {
            tracing::warn!(session_id = %session.id, error = %err, "session committed without aggregates");
        }
        self.core
            .notify(NotificationKind::Completed, session.duration_ms / MINUTE_MS);
        self.core.timer.reset();
        self.core.next_check_in_ms = None;
        Ok(Completion {
            session,
            commit_error,
        })
    }

    /// Runs every tick that is due in real time.
    pub fn tick(&mut self) -> TickReport {
        let report = self.scheduler.poll(&mut self.core);
        self.core.ledger.retry_pending();
        report
    }

    /// The host process is entering the background.
    pub fn on_suspend(&mut self) {
        self.tracker.on_suspend();
        self.scheduler.suspend();
    }

    /// The host noticed, after the fact, that it was suspended since `at`.
    pub fn on_suspend_at(&mut self, at: DateTime<Utc>) {
        self.tracker.on_suspend_at(at);
        self.scheduler.suspend();
    }

    /// The host process is back in the foreground.
    ///
    /// Background time stays active time; missed ticks are synthesized so goal
    /// and check-in notifications fire now instead of being skipped.
    ///
    /// Without a prior suspend this is an ordinary [`tick`](Self::tick).
    pub fn on_resume(&mut self) -> TickReport {
        if !self.tracker.is_suspended() {
            return self.tick();
        }
        let elapsed = self.tracker.on_resume();
        let report = self.scheduler.resume(elapsed, &mut self.core);
        self.core.ledger.retry_pending();
        report
    }

    pub fn elapsed_active_ms(&self) -> Result<i64, FocusError> {
        self.core.timer.elapsed_active_ms()
    }

    pub fn progress_ratio(&self) -> Option<f64> {
        self.core.timer.progress_ratio()
    }

    /// Current time according to the engine clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
