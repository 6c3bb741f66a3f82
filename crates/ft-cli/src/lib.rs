//! Focus timer CLI library.
//!
//! This crate provides the CLI interface for the focus timer.

mod cli;
pub mod commands;
mod config;
mod notify;

pub use cli::{ActivityAction, Cli, Commands, ReportArgs};
pub use config::Config;
pub use notify::TerminalNotifier;
