//! Status command for showing the session in progress.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::SecondsFormat;

use ft_store::Persistence;

use super::report::{format_duration, progress_bar};
use super::session::{Engine, activity_name};
use super::util::format_clock;

pub fn run<P: Persistence + 'static, W: Write>(
    writer: &mut W,
    engine: &Engine<P>,
    database_path: &Path,
) -> Result<()> {
    let Some(session) = engine.timer().session().filter(|_| engine.state().is_active()) else {
        writeln!(writer, "No session in progress.")?;
        writeln!(writer, "Database: {}", database_path.display())?;
        return Ok(());
    };

    let now = engine.now();
    let active_ms = engine.elapsed_active_ms()?;

    writeln!(writer, "{} ({})", activity_name(engine), engine.state())?;
    writeln!(
        writer,
        "Started:  {}",
        session.start_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    )?;
    writeln!(writer, "Active:   {}", format_clock(active_ms))?;
    let paused_ms = session.paused_ms(now);
    if paused_ms > 0 {
        writeln!(writer, "Paused:   {}", format_clock(paused_ms))?;
    }
    if let Some(target_ms) = session.target_ms {
        let percent = active_ms.saturating_mul(100) / target_ms;
        writeln!(
            writer,
            "Goal:     {}  {}  {}%",
            format_duration(target_ms),
            progress_bar(active_ms.min(target_ms), target_ms),
            percent.min(100)
        )?;
    }
    writeln!(writer, "Database: {}", database_path.display())?;

    Ok(())
}
