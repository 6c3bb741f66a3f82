//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Focus timer.
///
/// Times focus sessions per activity, net of pauses, and keeps counting while
/// the machine sleeps.
#[derive(Debug, Parser)]
#[command(name = "ft", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage activities.
    #[command(subcommand)]
    Activity(ActivityAction),

    /// Start a focus session.
    Start {
        /// Activity ID or name.
        activity: String,

        /// Session goal, e.g. 25m, 1h30m.
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Pause the running session.
    Pause,

    /// Resume the paused session.
    Resume,

    /// Stop the session and record it.
    Stop,

    /// Show the session in progress.
    Status,

    /// Follow the session in the foreground, sending progress notifications.
    ///
    /// Reads `pause`, `resume`, `stop` and `quit` from standard input.
    Watch,

    /// Generate a time report.
    Report(ReportArgs),
}

/// Activity subcommands.
#[derive(Debug, Subcommand)]
pub enum ActivityAction {
    /// Create an activity.
    Add {
        /// Display name.
        name: String,
    },

    /// List activities in display order.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rename an activity.
    Rename {
        /// Activity ID or name.
        activity: String,
        /// New display name.
        name: String,
    },

    /// Remove an activity. Its recorded sessions are kept.
    Remove {
        /// Activity ID or name.
        activity: String,
    },

    /// Set the display order. Unlisted activities follow in their current order.
    Reorder {
        /// Activity IDs or names, first to last.
        #[arg(required = true)]
        activities: Vec<String>,
    },

    /// Limit reports to these activities. Pass none to report on all.
    Select {
        /// Activity IDs or names.
        activities: Vec<String>,
    },
}

/// Report period flags.
#[derive(Debug, Args)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "mutually exclusive CLI flags"
)]
pub struct ReportArgs {
    /// Current week (default).
    #[arg(long, group = "period")]
    pub week: bool,

    /// Previous week.
    #[arg(long, group = "period")]
    pub last_week: bool,

    /// Today.
    #[arg(long, group = "period")]
    pub day: bool,

    /// Yesterday.
    #[arg(long, group = "period")]
    pub last_day: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}
