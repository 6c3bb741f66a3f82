//! Focus sessions and the pause bookkeeping behind their durations.
//!
//! A [`Session`] is only ever mutated through the timer state machine, which keeps
//! its `pauses` ordered and non-overlapping. Once `end_time` is set the record is
//! final and the store treats it as immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::millis_between;
use crate::types::{ActivityId, SessionId};

/// A paused interval inside a session. `end` is absent while the pause is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pause {
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl Pause {
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Length of the pause, measuring an open pause up to `as_of`.
    pub fn duration_ms(&self, as_of: DateTime<Utc>) -> i64 {
        millis_between(self.start, self.end.unwrap_or(as_of)).max(0)
    }
}

/// One focus episode tied to one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub activity_id: ActivityId,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Net active milliseconds. Zero until the session is finalized.
    #[serde(rename = "duration", default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub pauses: Vec<Pause>,
    #[serde(rename = "targetDuration", default, skip_serializing_if = "Option::is_none")]
    pub target_ms: Option<i64>,
}

impl Session {
    /// Creates an in-progress session with a fresh ID.
    pub fn begin(activity_id: ActivityId, start_time: DateTime<Utc>, target_ms: Option<i64>) -> Self {
        Self {
            id: SessionId::generate(),
            activity_id,
            start_time,
            end_time: None,
            duration_ms: 0,
            pauses: Vec::new(),
            target_ms,
        }
    }

    pub const fn is_ongoing(&self) -> bool {
        self.end_time.is_none()
    }

    pub const fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// The currently open pause, if any. Only the last entry can be open.
    pub fn open_pause(&self) -> Option<&Pause> {
        self.pauses.last().filter(|pause| pause.is_open())
    }

    /// Total paused time, counting an open pause up to `as_of`.
    pub fn paused_ms(&self, as_of: DateTime<Utc>) -> i64 {
        self.pauses.iter().map(|pause| pause.duration_ms(as_of)).sum()
    }

    /// Net active time as of `as_of`. Finalized sessions report their stored duration.
    pub fn active_ms(&self, as_of: DateTime<Utc>) -> i64 {
        if self.is_finalized() {
            return self.duration_ms;
        }
        (millis_between(self.start_time, as_of) - self.paused_ms(as_of)).max(0)
    }

    pub(crate) fn open_new_pause(&mut self, at: DateTime<Utc>) {
        self.pauses.push(Pause {
            start: at.max(self.start_time),
            end: None,
        });
    }

    /// Closes the open pause. Returns `false` if there was none.
    pub(crate) fn close_open_pause(&mut self, at: DateTime<Utc>) -> bool {
        match self.pauses.last_mut() {
            Some(pause) if pause.is_open() => {
                pause.end = Some(at.max(pause.start));
                true
            }
            _ => false,
        }
    }

    /// Closes any open pause at `end`, then fixes `end_time` and `duration_ms`.
    pub(crate) fn finalize(&mut self, end: DateTime<Utc>) {
        let end = end.max(self.start_time);
        self.close_open_pause(end);
        self.end_time = Some(end);
        self.duration_ms = (millis_between(self.start_time, end) - self.paused_ms(end)).max(0);
    }
}
