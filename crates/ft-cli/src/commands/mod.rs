//! CLI subcommand implementations.

pub mod activity;
pub mod report;
pub mod session;
pub mod status;
pub mod util;
pub mod watch;
