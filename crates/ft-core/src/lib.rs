//! Session time-accounting engine for the focus timer.
//!
//! This crate contains the fundamental types and logic for:
//! - Activities and sessions, with net active time net of pauses
//! - The session timer state machine (start, pause, resume, stop)
//! - Suspension tracking and interval ticks with catch-up after suspension
//! - The engine that ties them to a store and a notifier

pub mod activity;
pub mod clock;
pub mod engine;
mod error;
pub mod notify;
pub mod scheduler;
pub mod session;
pub mod suspension;
pub mod timer;
pub mod types;

pub use activity::Activity;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Completion, EngineConfig, FocusEngine, SessionLedger};
pub use error::FocusError;
pub use notify::{LogNotifier, NotificationKind, Notifier};
pub use scheduler::{IntervalScheduler, ScheduleHandle, TickError, TickFailure, TickReport};
pub use session::{Pause, Session};
pub use suspension::SuspensionTracker;
pub use timer::{SessionTimer, TimerState};
pub use types::{ActivityId, SessionId, ValidationError};
