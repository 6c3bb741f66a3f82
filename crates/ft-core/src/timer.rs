//! Session timer state machine.
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --resume--> Running ...
//!                    \                  /
//!                     +-----stop-------+--> Stopped --reset--> Idle
//! ```
//!
//! The timer owns at most one session, which is how the single-active-session
//! invariant is enforced: `start` is refused unless the timer is `Idle`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::FocusError;
use crate::session::Session;
use crate::types::{ActivityId, validate_target};

/// Lifecycle state of the [`SessionTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

impl TimerState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a session is in progress (running or paused).
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks a single session through start, pause, resume and stop.
pub struct SessionTimer {
    clock: Arc<dyn Clock>,
    state: TimerState,
    session: Option<Session>,
    goal_reached: bool,
}

impl SessionTimer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: TimerState::Idle,
            session: None,
            goal_reached: false,
        }
    }

    pub const fn state(&self) -> TimerState {
        self.state
    }

    /// The in-progress session, or the finalized one while `Stopped`.
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether the goal-reached condition has already been reported.
    pub const fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    /// Starts a new session for `activity_id`.
    ///
    /// Only valid from `Idle`; any other state leaves the timer untouched.
    pub fn start(
        &mut self,
        activity_id: ActivityId,
        target_ms: Option<i64>,
    ) -> Result<&Session, FocusError> {
        if self.state != TimerState::Idle {
            return Err(self.refuse("start a session"));
        }
        let target_ms = validate_target(target_ms)?;
        let session = Session::begin(activity_id, self.clock.now(), target_ms);
        tracing::debug!(
            session_id = %session.id,
            activity_id = %session.activity_id,
            target_ms,
            "session started"
        );
        self.goal_reached = false;
        self.state = TimerState::Running;
        Ok(self.session.insert(session))
    }

    /// Rebuilds a `Running` or `Paused` timer from a persisted in-progress session.
    ///
    /// A goal already met at restore time counts as reported, so relaunching the
    /// process does not repeat the goal side effect.
    pub fn restore(&mut self, session: Session) -> Result<(), FocusError> {
        if self.state != TimerState::Idle {
            return Err(self.refuse("restore a session"));
        }
        if session.is_finalized() {
            return Err(FocusError::invalid_state(
                "restore a session",
                format!("session {} is already finalized", session.id),
            ));
        }
        let now = self.clock.now();
        self.goal_reached = session
            .target_ms
            .is_some_and(|target| session.active_ms(now) >= target);
        self.state = if session.open_pause().is_some() {
            TimerState::Paused
        } else {
            TimerState::Running
        };
        tracing::debug!(session_id = %session.id, state = %self.state, "session restored");
        self.session = Some(session);
        Ok(())
    }

    /// Pauses a running session.
    ///
    /// Returns `Ok(false)` without change if already paused, and an error if no
    /// session is in progress.
    pub fn pause(&mut self) -> Result<bool, FocusError> {
        match self.state {
            TimerState::Paused => Ok(false),
            TimerState::Running => {
                let now = self.clock.now();
                if let Some(session) = self.session.as_mut() {
                    session.open_new_pause(now);
                }
                self.state = TimerState::Paused;
                tracing::debug!("session paused");
                Ok(true)
            }
            TimerState::Idle | TimerState::Stopped => Err(self.refuse("pause")),
        }
    }

    /// Resumes a paused session. Returns `false` if the timer was not paused.
    pub fn resume(&mut self) -> bool {
        if self.state != TimerState::Paused {
            return false;
        }
        let now = self.clock.now();
        if let Some(session) = self.session.as_mut() {
            session.close_open_pause(now);
        }
        self.state = TimerState::Running;
        tracing::debug!("session resumed");
        true
    }

    /// Stops the session, returning the finalized record.
    ///
    /// An open pause is closed at the stop timestamp before the duration is
    /// computed. The timer stays `Stopped` until [`reset`](Self::reset).
    pub fn stop(&mut self) -> Result<Session, FocusError> {
        if !self.state.is_active() {
            return Err(self.refuse("stop"));
        }
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return Err(FocusError::invalid_state("stop", "no session is attached"));
        };
        session.finalize(now);
        self.state = TimerState::Stopped;
        tracing::debug!(
            session_id = %session.id,
            duration_ms = session.duration_ms,
            "session stopped"
        );
        Ok(session.clone())
    }

    /// Returns a `Stopped` timer to `Idle`. Returns `false` in any other state.
    pub fn reset(&mut self) -> bool {
        if self.state != TimerState::Stopped {
            return false;
        }
        self.state = TimerState::Idle;
        self.session = None;
        self.goal_reached = false;
        true
    }

    /// Drops the current session without finalizing it and returns to `Idle`.
    ///
    /// Used to undo a `start` whose follow-up steps failed; nothing is recorded.
    pub fn discard(&mut self) -> Option<Session> {
        let session = self.session.take()?;
        tracing::debug!(session_id = %session.id, "session discarded");
        self.state = TimerState::Idle;
        self.goal_reached = false;
        Some(session)
    }

    /// Net active time as of now.
    pub fn elapsed_active_ms(&self) -> Result<i64, FocusError> {
        self.elapsed_active_ms_at(self.clock.now())
    }

    /// Net active time as of `as_of`, without mutating state.
    ///
    /// A `Stopped` timer reports the finalized duration.
    pub fn elapsed_active_ms_at(&self, as_of: DateTime<Utc>) -> Result<i64, FocusError> {
        match (&self.session, self.state) {
            (Some(session), TimerState::Running | TimerState::Paused | TimerState::Stopped) => {
                Ok(session.active_ms(as_of))
            }
            _ => Err(self.refuse("measure elapsed time")),
        }
    }

    /// Progress toward the target in `[0, 1]`, or `None` without a target.
    pub fn progress_ratio(&self) -> Option<f64> {
        self.progress_ratio_at(self.clock.now())
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn progress_ratio_at(&self, as_of: DateTime<Utc>) -> Option<f64> {
        let target = self.session.as_ref()?.target_ms?;
        let elapsed = self.elapsed_active_ms_at(as_of).ok()?;
        Some((elapsed as f64 / target as f64).clamp(0.0, 1.0))
    }

    /// Checks the goal-reached condition as of now.
    pub fn poll_goal(&mut self) -> bool {
        let now = self.clock.now();
        self.poll_goal_at(now)
    }

    /// Returns `true` exactly once: the first time active time meets the target.
    ///
    /// The session keeps running afterwards.
    pub fn poll_goal_at(&mut self, as_of: DateTime<Utc>) -> bool {
        if self.goal_reached || !self.state.is_active() {
            return false;
        }
        let Some(target) = self.session.as_ref().and_then(|s| s.target_ms) else {
            return false;
        };
        let reached = self
            .elapsed_active_ms_at(as_of)
            .is_ok_and(|elapsed| elapsed >= target);
        if reached {
            tracing::debug!(target_ms = target, "goal reached");
            self.goal_reached = true;
        }
        reached
    }

    fn refuse(&self, operation: &'static str) -> FocusError {
        FocusError::invalid_state(operation, format!("timer is {}", self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::clock::ManualClock;

    const MINUTE: i64 = 60_000;

    fn setup() -> (ManualClock, SessionTimer) {
        let start = DateTime::parse_from_rfc3339("2025-03-10T14:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = ManualClock::new(start);
        let timer = SessionTimer::new(Arc::new(clock.clone()));
        (clock, timer)
    }

    fn activity() -> ActivityId {
        ActivityId::new("deep-work").unwrap()
    }

    #[test]
    fn target_scenario_with_single_pause() {
        let (clock, mut timer) = setup();
        timer.start(activity(), Some(30 * MINUTE)).unwrap();

        clock.advance_ms(10 * MINUTE);
        assert!(timer.pause().unwrap());
        clock.advance_ms(2 * MINUTE);
        assert!(timer.resume());

        let mut goal_hits = 0;
        for _ in 0..25 {
            clock.advance_ms(MINUTE);
            if timer.poll_goal() {
                goal_hits += 1;
            }
        }

        let session = timer.stop().unwrap();
        assert_eq!(session.duration_ms, 2_100_000);
        assert_eq!(goal_hits, 1);
        assert_eq!(session.pauses.len(), 1);
        assert_eq!(timer.state(), TimerState::Stopped);
    }

    #[test]
    fn goal_fires_when_active_time_crosses_target() {
        let (clock, mut timer) = setup();
        timer.start(activity(), Some(30 * MINUTE)).unwrap();
        clock.advance_ms(10 * MINUTE);
        timer.pause().unwrap();
        clock.advance_ms(2 * MINUTE);
        timer.resume();

        // 29 active minutes: not yet.
        clock.advance_ms(19 * MINUTE);
        assert!(!timer.poll_goal());
        clock.advance_ms(MINUTE);
        assert!(timer.poll_goal());
        assert!(timer.goal_reached());
        clock.advance_ms(MINUTE);
        assert!(!timer.poll_goal());
    }

    #[test]
    fn duration_formula_over_many_pauses() {
        let (clock, mut timer) = setup();
        let started = clock.now();
        timer.start(activity(), None).unwrap();

        let mut paused = 0;
        for i in 1..=4 {
            clock.advance_ms(i * 1_000);
            timer.pause().unwrap();
            clock.advance_ms(i * 500);
            paused += i * 500;
            timer.resume();
        }
        clock.advance_ms(3_000);
        timer.pause().unwrap();
        clock.advance_ms(7_000);
        paused += 7_000;

        let session = timer.stop().unwrap();
        let end = session.end_time.unwrap();
        assert_eq!(end, clock.now());
        assert_eq!(
            session.duration_ms,
            (end - started).num_milliseconds() - paused
        );
        assert!(session.pauses.iter().all(|p| p.end.is_some()));
        assert_eq!(session.pauses.last().unwrap().end, Some(end));
    }

    #[test]
    fn double_pause_keeps_single_open_entry() {
        let (clock, mut timer) = setup();
        timer.start(activity(), None).unwrap();
        clock.advance_ms(1_000);

        assert!(timer.pause().unwrap());
        clock.advance_ms(1_000);
        assert!(!timer.pause().unwrap());

        let session = timer.session().unwrap();
        assert_eq!(session.pauses.len(), 1);
        assert!(session.pauses[0].is_open());
    }

    #[test]
    fn resume_without_pause_is_noop() {
        let (clock, mut timer) = setup();
        assert!(!timer.resume());
        timer.start(activity(), None).unwrap();
        clock.advance_ms(1_000);

        assert!(!timer.resume());
        assert_eq!(timer.state(), TimerState::Running);
        assert!(timer.session().unwrap().pauses.is_empty());
    }

    #[test]
    fn start_while_active_fails_without_change() {
        let (clock, mut timer) = setup();
        let original = timer.start(activity(), Some(MINUTE)).unwrap().clone();

        let err = timer
            .start(ActivityId::new("other").unwrap(), None)
            .unwrap_err();
        assert!(matches!(err, FocusError::InvalidState { .. }));
        assert_eq!(timer.session(), Some(&original));

        clock.advance_ms(1_000);
        timer.pause().unwrap();
        let snapshot = timer.session().cloned();
        assert!(timer.start(activity(), None).is_err());
        assert_eq!(timer.session().cloned(), snapshot);
        assert_eq!(timer.state(), TimerState::Paused);
    }

    #[test]
    fn stop_and_pause_require_a_session() {
        let (_clock, mut timer) = setup();
        assert!(matches!(timer.stop(), Err(FocusError::InvalidState { .. })));
        assert!(matches!(timer.pause(), Err(FocusError::InvalidState { .. })));
        assert!(timer.elapsed_active_ms().is_err());
    }

    #[test]
    fn start_requires_reset_after_stop() {
        let (_clock, mut timer) = setup();
        timer.start(activity(), None).unwrap();
        timer.stop().unwrap();

        assert!(timer.start(activity(), None).is_err());
        assert!(timer.stop().is_err());
        assert!(timer.reset());
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(timer.session().is_none());
        assert!(timer.start(activity(), None).is_ok());
    }

    #[test]
    fn elapsed_counts_open_pause_as_inactive() {
        let (clock, mut timer) = setup();
        let t0 = clock.now();
        timer.start(activity(), None).unwrap();
        clock.advance_ms(4 * MINUTE);
        timer.pause().unwrap();

        let later = t0 + Duration::minutes(10);
        assert_eq!(timer.elapsed_active_ms_at(later).unwrap(), 4 * MINUTE);
        // Querying does not mutate.
        assert!(timer.session().unwrap().pauses[0].is_open());
    }

    #[test]
    fn progress_ratio_is_clamped() {
        let (clock, mut timer) = setup();
        assert_eq!(timer.progress_ratio(), None);
        timer.start(activity(), Some(10 * MINUTE)).unwrap();

        clock.advance_ms(5 * MINUTE);
        assert!((timer.progress_ratio().unwrap() - 0.5).abs() < f64::EPSILON);
        clock.advance_ms(20 * MINUTE);
        assert!((timer.progress_ratio().unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_ratio_without_target_is_none() {
        let (clock, mut timer) = setup();
        timer.start(activity(), None).unwrap();
        clock.advance_ms(MINUTE);
        assert_eq!(timer.progress_ratio(), None);
        assert!(!timer.poll_goal());
    }

    #[test]
    fn start_rejects_non_positive_target() {
        let (_clock, mut timer) = setup();
        let err = timer.start(activity(), Some(0)).unwrap_err();
        assert!(matches!(err, FocusError::Validation(_)));
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn discard_returns_to_idle_without_finalizing() {
        let (clock, mut timer) = setup();
        timer.start(activity(), Some(MINUTE)).unwrap();
        clock.advance_ms(MINUTE);
        assert!(timer.poll_goal());

        let dropped = timer.discard().unwrap();
        assert!(dropped.end_time.is_none());
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(timer.session().is_none());
        assert!(!timer.goal_reached());
        assert!(timer.discard().is_none());
        assert!(timer.start(activity(), None).is_ok());
    }

    #[test]
    fn restore_rebuilds_paused_state() {
        let (clock, mut timer) = setup();
        timer.start(activity(), Some(60 * MINUTE)).unwrap();
        clock.advance_ms(5 * MINUTE);
        timer.pause().unwrap();
        let persisted = timer.session().unwrap().clone();

        let (_, mut relaunched) = setup();
        relaunched.restore(persisted).unwrap();
        assert_eq!(relaunched.state(), TimerState::Paused);
        assert!(!relaunched.goal_reached());
        assert!(relaunched.resume());
    }

    #[test]
    fn restore_past_target_suppresses_goal() {
        let (clock, mut timer) = setup();
        timer.start(activity(), Some(MINUTE)).unwrap();
        let persisted = timer.session().unwrap().clone();

        let relaunched_clock = clock.clone();
        relaunched_clock.advance_ms(2 * MINUTE);
        let mut relaunched = SessionTimer::new(Arc::new(relaunched_clock));
        relaunched.restore(persisted).unwrap();

        assert_eq!(relaunched.state(), TimerState::Running);
        assert!(relaunched.goal_reached());
        assert!(!relaunched.poll_goal());
    }

    #[test]
    fn restore_rejects_finalized_session() {
        let (_clock, mut timer) = setup();
        timer.start(activity(), None).unwrap();
        let finished = timer.stop().unwrap();

        let (_, mut other) = setup();
        assert!(other.restore(finished).is_err());
        assert_eq!(other.state(), TimerState::Idle);
    }
}
