//! Activities - named things a user focuses on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityId, ValidationError, validate_activity_name};

/// A named activity that sessions are tracked against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique identifier (UUID), never reused.
    pub id: ActivityId,

    /// Display name, stored trimmed.
    pub name: String,

    /// Cumulative net duration of all committed sessions in milliseconds.
    #[serde(rename = "totalTime", default)]
    pub total_time_ms: i64,

    /// End time of the most recent committed session, or the creation time.
    pub last_used: DateTime<Utc>,

    /// Display order. Not required to be contiguous.
    #[serde(default)]
    pub order: i64,
}

impl Activity {
    /// Creates a new activity with a fresh ID.
    pub fn new(name: &str, order: i64, created_at: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: ActivityId::generate(),
            name: validate_activity_name(name)?,
            total_time_ms: 0,
            last_used: created_at,
            order,
        })
    }

    /// Folds one finalized session into the aggregates.
    pub fn record_session(&mut self, duration_ms: i64, ended_at: DateTime<Utc>) {
        self.total_time_ms = self.total_time_ms.saturating_add(duration_ms.max(0));
        if ended_at > self.last_used {
            self.last_used = ended_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn new_activity_starts_empty() {
        let created = ts("2025-01-01T08:00:00Z");
        let activity = Activity::new(" Writing ", 3, created).unwrap();

        assert_eq!(activity.name, "Writing");
        assert_eq!(activity.total_time_ms, 0);
        assert_eq!(activity.last_used, created);
        assert_eq!(activity.order, 3);
    }

    #[test]
    fn new_activity_rejects_blank_name() {
        assert!(Activity::new("   ", 0, ts("2025-01-01T08:00:00Z")).is_err());
    }

    #[test]
    fn record_session_accumulates() {
        let mut activity = Activity::new("Reading", 0, ts("2025-01-01T08:00:00Z")).unwrap();
        activity.record_session(600_000, ts("2025-01-01T09:00:00Z"));
        activity.record_session(300_000, ts("2025-01-01T10:00:00Z"));

        assert_eq!(activity.total_time_ms, 900_000);
        assert_eq!(activity.last_used, ts("2025-01-01T10:00:00Z"));
    }

    #[test]
    fn serializes_with_document_field_names() {
        let activity = Activity::new("Reading", 1, ts("2025-01-01T08:00:00Z")).unwrap();
        let value = serde_json::to_value(&activity).unwrap();

        assert!(value.get("totalTime").is_some());
        assert!(value.get("lastUsed").is_some());
        assert_eq!(value["order"], 1);
    }
}
