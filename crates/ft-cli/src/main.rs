use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ft_cli::commands::session::Engine;
use ft_cli::commands::{activity, report, session, status, util, watch};
use ft_cli::{ActivityAction, Cli, Commands, Config, ReportArgs, TerminalNotifier};
use ft_core::{Clock, FocusEngine, SystemClock};
use ft_store::{SessionStore, SqliteStorage};

/// Load config and open the store, ensuring the database directory exists.
fn open_store(
    config_path: Option<&Path>,
) -> Result<(SessionStore<SqliteStorage>, Arc<dyn Clock>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let storage = SqliteStorage::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = SessionStore::open(storage, Arc::clone(&clock), config.retry_policy())
        .context("failed to load store")?;
    Ok((store, clock, config))
}

/// Open the store and wrap it in an engine, resuming any session in progress.
fn open_engine(config_path: Option<&Path>) -> Result<(Engine<SqliteStorage>, Config)> {
    let (store, clock, config) = open_store(config_path)?;
    let engine = FocusEngine::new(
        clock,
        store,
        Box::new(TerminalNotifier),
        config.engine_config(),
    )
    .context("invalid engine configuration")?;
    Ok((engine, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config_path = cli.config.as_deref();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Activity(action)) => {
            let (mut store, _clock, _config) = open_store(config_path)?;
            match action {
                ActivityAction::Add { name } => activity::add(&mut out, &mut store, name)?,
                ActivityAction::List { json } => activity::list(&mut out, &store, *json)?,
                ActivityAction::Rename {
                    activity: query,
                    name,
                } => activity::rename(&mut out, &mut store, query, name)?,
                ActivityAction::Remove { activity: query } => {
                    activity::remove(&mut out, &mut store, query)?;
                }
                ActivityAction::Reorder { activities } => {
                    activity::reorder(&mut out, &mut store, activities)?;
                }
                ActivityAction::Select { activities } => {
                    activity::select(&mut out, &mut store, activities)?;
                }
            }
            util::flush_store(&mut store)?;
        }
        Some(Commands::Start {
            activity: query,
            target,
        }) => {
            let (mut engine, _config) = open_engine(config_path)?;
            session::start(&mut out, &mut engine, query, target.as_deref())?;
            util::flush_store(engine.ledger_mut())?;
        }
        Some(Commands::Pause) => {
            let (mut engine, _config) = open_engine(config_path)?;
            session::pause(&mut out, &mut engine)?;
            util::flush_store(engine.ledger_mut())?;
        }
        Some(Commands::Resume) => {
            let (mut engine, _config) = open_engine(config_path)?;
            session::resume(&mut out, &mut engine)?;
            util::flush_store(engine.ledger_mut())?;
        }
        Some(Commands::Stop) => {
            let (mut engine, _config) = open_engine(config_path)?;
            session::stop(&mut out, &mut engine)?;
            util::flush_store(engine.ledger_mut())?;
        }
        Some(Commands::Status) => {
            let (engine, config) = open_engine(config_path)?;
            status::run(&mut out, &engine, &config.database_path)?;
        }
        Some(Commands::Watch) => {
            let (mut engine, config) = open_engine(config_path)?;
            watch::run(&mut out, &mut engine, &config)?;
        }
        Some(Commands::Report(ReportArgs {
            week: _,
            last_week,
            day,
            last_day,
            json,
        })) => {
            let (store, _clock, _config) = open_store(config_path)?;
            let period = if *last_week {
                report::Period::LastWeek
            } else if *day {
                report::Period::Day
            } else if *last_day {
                report::Period::LastDay
            } else {
                report::Period::Week
            };
            report::run(&mut out, &store, period, *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    out.flush()?;
    Ok(())
}
