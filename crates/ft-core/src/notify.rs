//! Notification collaborator contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the engine is notifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Active time met the session target. Sent once per session.
    GoalReached,
    /// The session was stopped.
    Completed,
    /// Periodic reminder while a session keeps running.
    CheckIn,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GoalReached => "goal_reached",
            Self::Completed => "completed",
            Self::CheckIn => "check_in",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort delivery of user notifications.
///
/// Implementations must not block; the engine ignores the outcome.
pub trait Notifier {
    fn notify(&self, kind: NotificationKind, activity_name: &str, minutes: i64);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotificationKind, activity_name: &str, minutes: i64) {
        tracing::info!(%kind, activity = activity_name, minutes, "notification");
    }
}
