//! The persisted store document.
//!
//! Shape:
//!
//! ```json
//! {
//!   "activities": [...],
//!   "sessions": [...],
//!   "currentSession": null,
//!   "isFirstTime": true,
//!   "selectedActivities": []
//! }
//! ```
//!
//! Timestamps are ISO 8601 strings in UTC. All fields default when missing so
//! documents written by older versions still load.

use serde::{Deserialize, Serialize};

use ft_core::{Activity, ActivityId, Session};

use crate::StoreError;

/// Everything the store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default)]
    pub activities: Vec<Activity>,

    /// Finalized sessions, in commit order.
    #[serde(default)]
    pub sessions: Vec<Session>,

    /// The in-progress session, if any.
    #[serde(default)]
    pub current_session: Option<Session>,

    #[serde(default = "default_first_time")]
    pub is_first_time: bool,

    /// Activities chosen for reports. Empty means all.
    #[serde(default)]
    pub selected_activities: Vec<ActivityId>,
}

const fn default_first_time() -> bool {
    true
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            activities: Vec::new(),
            sessions: Vec::new(),
            current_session: None,
            is_first_time: default_first_time(),
            selected_activities: Vec::new(),
        }
    }
}

impl StoreDocument {
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }
}
