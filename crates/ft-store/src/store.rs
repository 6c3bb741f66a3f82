//! The session store: activities, finalized sessions and the in-progress slot.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use ft_core::types::validate_activity_name;
use ft_core::{Activity, ActivityId, Clock, FocusError, Session, SessionLedger, ValidationError};

use crate::document::StoreDocument;
use crate::persistence::Persistence;
use crate::retry::{PendingWrite, RetryPolicy};
use crate::StoreError;

/// Key the document is stored under.
pub const STORE_KEY: &str = "focus-timer";

/// Single source of truth for activities and sessions.
///
/// Every mutation updates memory first and then writes the whole document
/// through to `P`. A failed write is kept as a [`PendingWrite`] and retried with
/// backoff; it never rolls back the in-memory change.
pub struct SessionStore<P> {
    clock: Arc<dyn Clock>,
    storage: P,
    retry: RetryPolicy,
    doc: StoreDocument,
    pending: Option<PendingWrite>,
}

impl<P: Persistence> SessionStore<P> {
    /// Loads the store from `storage`, starting empty if nothing was saved yet.
    pub fn open(storage: P, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Result<Self, StoreError> {
        let doc = match storage.load(STORE_KEY)? {
            Some(json) => StoreDocument::from_json(&json)?,
            None => StoreDocument::default(),
        };
        let mut store = Self {
            clock,
            storage,
            retry,
            doc,
            pending: None,
        };
        store.finish_interrupted_commit();
        tracing::debug!(
            activities = store.doc.activities.len(),
            sessions = store.doc.sessions.len(),
            in_progress = store.doc.current_session.is_some(),
            "store opened"
        );
        Ok(store)
    }

    /// A finalized session left in the in-progress slot means the process died
    /// between stop and commit. Completing the commit keeps reports from ever
    /// seeing it half-done.
    fn finish_interrupted_commit(&mut self) {
        let finalized = self
            .doc
            .current_session
            .as_ref()
            .is_some_and(Session::is_finalized);
        if !finalized {
            return;
        }
        if let Some(session) = self.doc.current_session.take() {
            tracing::warn!(session_id = %session.id, "completing interrupted session commit");
            if let Err(err) = self.commit_session(session) {
                tracing::warn!(error = %err, "interrupted session kept without aggregates");
            }
        }
    }

    pub const fn document(&self) -> &StoreDocument {
        &self.doc
    }

    pub const fn storage(&self) -> &P {
        &self.storage
    }

    // ========== Activities ==========

    /// Activities in display order.
    pub fn activities(&self) -> Vec<&Activity> {
        let mut activities: Vec<&Activity> = self.doc.activities.iter().collect();
        activities.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        activities
    }

    pub fn activity(&self, id: &ActivityId) -> Option<&Activity> {
        self.doc.activities.iter().find(|a| &a.id == id)
    }

    /// Looks an activity up by exact ID or case-insensitive name.
    pub fn find_activity(&self, query: &str) -> Option<&Activity> {
        let query = query.trim();
        self.doc
            .activities
            .iter()
            .find(|a| a.id.as_str() == query)
            .or_else(|| {
                self.doc
                    .activities
                    .iter()
                    .find(|a| a.name.eq_ignore_ascii_case(query))
            })
    }

    fn activity_mut(&mut self, id: &ActivityId) -> Result<&mut Activity, FocusError> {
        self.doc
            .activities
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| FocusError::activity_not_found(id.as_str()))
    }

    /// Creates an activity at the end of the display order.
    pub fn add_activity(&mut self, name: &str) -> Result<Activity, FocusError> {
        let order = self
            .doc
            .activities
            .iter()
            .map(|a| a.order)
            .max()
            .map_or(0, |last| last.saturating_add(1));
        let activity = Activity::new(name, order, self.clock.now())?;
        tracing::debug!(activity_id = %activity.id, name = %activity.name, "activity added");
        self.doc.activities.push(activity.clone());
        self.persist();
        Ok(activity)
    }

    /// Removes an activity. Its sessions stay in history as orphans.
    pub fn remove_activity(&mut self, id: &ActivityId) -> Result<Activity, FocusError> {
        let index = self
            .doc
            .activities
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| FocusError::activity_not_found(id.as_str()))?;
        let removed = self.doc.activities.remove(index);
        self.doc.selected_activities.retain(|selected| selected != id);
        tracing::debug!(activity_id = %id, "activity removed");
        self.persist();
        Ok(removed)
    }

    pub fn rename_activity(&mut self, id: &ActivityId, name: &str) -> Result<(), FocusError> {
        let name = validate_activity_name(name)?;
        self.activity_mut(id)?.name = name;
        self.persist();
        Ok(())
    }

    /// Reassigns `order` from list position.
    ///
    /// Activities missing from `ordered` keep their relative order after the
    /// listed ones. Nothing changes if any listed ID is unknown.
    pub fn reorder_activities(&mut self, ordered: &[ActivityId]) -> Result<(), FocusError> {
        if let Some(unknown) = ordered.iter().find(|id| self.activity(id).is_none()) {
            return Err(FocusError::activity_not_found(unknown.as_str()));
        }
        let unlisted: Vec<ActivityId> = self
            .activities()
            .into_iter()
            .filter(|a| !ordered.contains(&a.id))
            .map(|a| a.id.clone())
            .collect();
        let mut position = 0_i64;
        for id in ordered.iter().chain(unlisted.iter()) {
            if let Ok(activity) = self.activity_mut(id) {
                activity.order = position;
                position += 1;
            }
        }
        self.persist();
        Ok(())
    }

    /// Activities chosen for reports. Empty means all.
    pub fn selected_activities(&self) -> &[ActivityId] {
        &self.doc.selected_activities
    }

    pub fn select_activities(&mut self, ids: &[ActivityId]) -> Result<(), FocusError> {
        if let Some(unknown) = ids.iter().find(|id| self.activity(id).is_none()) {
            return Err(FocusError::activity_not_found(unknown.as_str()));
        }
        let mut selected: Vec<ActivityId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !selected.contains(id) {
                selected.push(id.clone());
            }
        }
        self.doc.selected_activities = selected;
        self.persist();
        Ok(())
    }

    pub const fn is_first_time(&self) -> bool {
        self.doc.is_first_time
    }

    pub fn set_first_time(&mut self, first_time: bool) {
        if self.doc.is_first_time != first_time {
            self.doc.is_first_time = first_time;
            self.persist();
        }
    }

    // ========== Sessions ==========

    /// Finalized sessions in commit order.
    pub fn sessions(&self) -> &[Session] {
        &self.doc.sessions
    }

    pub const fn current_session(&self) -> Option<&Session> {
        self.doc.current_session.as_ref()
    }

    pub fn set_current_session(&mut self, session: Option<Session>) {
        self.doc.current_session = session;
        self.persist();
    }

    /// Appends a finalized session and folds it into its activity.
    ///
    /// Committing an already committed session ID is a no-op. When the activity no
    /// longer exists the session is still kept and `NotFound` is returned.
    pub fn commit_session(&mut self, session: Session) -> Result<(), FocusError> {
        let Some(ended_at) = session.end_time else {
            return Err(FocusError::invalid_state(
                "commit a session",
                format!("session {} is still in progress", session.id),
            ));
        };
        if session.duration_ms < 0 {
            return Err(ValidationError::NegativeDuration {
                field: "session duration",
                value: session.duration_ms,
            }
            .into());
        }
        if self
            .doc
            .current_session
            .as_ref()
            .is_some_and(|current| current.id == session.id)
        {
            self.doc.current_session = None;
        }
        if self.doc.sessions.iter().any(|s| s.id == session.id) {
            tracing::debug!(session_id = %session.id, "session already committed");
            self.persist();
            return Ok(());
        }

        let result = self
            .activity_mut(&session.activity_id)
            .map(|activity| activity.record_session(session.duration_ms, ended_at));
        tracing::debug!(
            session_id = %session.id,
            activity_id = %session.activity_id,
            duration_ms = session.duration_ms,
            orphaned = result.is_err(),
            "session committed"
        );
        self.doc.sessions.push(session);
        self.persist();
        result
    }

    /// Committed sessions that started in `[start, end)`, ordered by start time.
    pub fn sessions_within_interval(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&Session> {
        if end <= start {
            return Vec::new();
        }
        let mut sessions: Vec<&Session> = self
            .doc
            .sessions
            .iter()
            .filter(|s| s.is_finalized() && s.start_time >= start && s.start_time < end)
            .collect();
        sessions.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        sessions
    }

    // ========== Durability ==========

    /// The write that has not reached storage yet, if any.
    pub const fn pending_write(&self) -> Option<&PendingWrite> {
        self.pending.as_ref()
    }

    /// Retries a failed write if its backoff has elapsed. Returns `true` on success.
    pub fn retry_pending_write(&mut self) -> bool {
        let now = self.clock.now();
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.is_due(&self.retry, now));
        if !due {
            return false;
        }
        self.persist();
        self.pending.is_none()
    }

    /// Writes the document now, regardless of backoff.
    pub fn flush(&mut self) -> Result<(), FocusError> {
        self.persist();
        match &self.pending {
            Some(pending) => Err(FocusError::Persistence {
                message: pending.last_error.clone(),
            }),
            None => Ok(()),
        }
    }

    fn persist(&mut self) {
        let result = self
            .doc
            .to_json()
            .and_then(|json| self.storage.save(STORE_KEY, &json));
        match result {
            Ok(()) => {
                if self.pending.take().is_some() {
                    tracing::info!("pending store write persisted");
                }
            }
            Err(err) => {
                let pending = PendingWrite::record_failure(
                    self.pending.as_ref(),
                    &self.retry,
                    self.clock.now(),
                    err.to_string(),
                );
                tracing::warn!(
                    error = %err,
                    failed_attempts = pending.failed_attempts,
                    next_attempt_at = %pending.next_attempt_at,
                    "store write failed; keeping in-memory state"
                );
                self.pending = Some(pending);
            }
        }
    }
}

impl<P: Persistence> SessionLedger for SessionStore<P> {
    fn activity(&self, id: &ActivityId) -> Option<&Activity> {
        Self::activity(self, id)
    }

    fn current_session(&self) -> Option<&Session> {
        Self::current_session(self)
    }

    fn set_current_session(&mut self, session: Option<Session>) {
        Self::set_current_session(self, session);
    }

    fn commit_session(&mut self, session: Session) -> Result<(), FocusError> {
        Self::commit_session(self, session)
    }

    fn retry_pending(&mut self) {
        self.retry_pending_write();
    }
}

/// Sums session durations per activity.
pub fn activity_totals<'a, I>(sessions: I) -> BTreeMap<ActivityId, i64>
where
    I: IntoIterator<Item = &'a Session>,
{
    let mut totals: BTreeMap<ActivityId, i64> = BTreeMap::new();
    for session in sessions {
        *totals.entry(session.activity_id.clone()).or_default() += session.duration_ms;
    }
    totals
}
