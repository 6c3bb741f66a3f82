//! Notifications printed to the terminal.

use ft_core::{NotificationKind, Notifier};

/// Prints notifications on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, kind: NotificationKind, activity_name: &str, minutes: i64) {
        tracing::debug!(%kind, activity = activity_name, minutes, "notification");
        println!("{}", message(kind, activity_name, minutes));
    }
}

fn message(kind: NotificationKind, activity_name: &str, minutes: i64) -> String {
    match kind {
        NotificationKind::GoalReached => {
            format!("Goal reached: {minutes}m of {activity_name}")
        }
        NotificationKind::Completed => {
            format!("Session complete: {minutes}m of {activity_name}")
        }
        NotificationKind::CheckIn => {
            format!("Still focused on {activity_name}: {minutes}m so far")
        }
    }
}
