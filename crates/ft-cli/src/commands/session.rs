//! Session lifecycle commands: start, pause, resume, stop.

use std::io::Write;

use anyhow::Result;

use ft_core::{FocusEngine, FocusError, TimerState};
use ft_store::{Persistence, SessionStore};

use super::report::format_duration;
use super::util::{parse_duration, resolve_activity};

/// The engine as driven by the CLI.
pub type Engine<P> = FocusEngine<SessionStore<P>>;

pub fn start<P: Persistence + 'static, W: Write>(
    writer: &mut W,
    engine: &mut Engine<P>,
    activity: &str,
    target: Option<&str>,
) -> Result<()> {
    let activity_id = resolve_activity(engine.ledger(), activity)?;
    let target_ms = target.map(parse_duration).transpose()?;

    let session = engine.start(&activity_id, target_ms).map_err(|err| match err {
        FocusError::InvalidState { .. } => {
            anyhow::anyhow!("A session is already in progress. Run 'ft stop' first.")
        }
        other => other.into(),
    })?;
    engine.ledger_mut().set_first_time(false);

    let name = activity_name(engine);
    match session.target_ms {
        Some(target_ms) => writeln!(
            writer,
            "Started {name} (goal {})",
            format_duration(target_ms)
        )?,
        None => writeln!(writer, "Started {name}")?,
    }
    Ok(())
}

pub fn pause<P: Persistence + 'static, W: Write>(
    writer: &mut W,
    engine: &mut Engine<P>,
) -> Result<()> {
    require_session(engine)?;
    if engine.pause()? {
        writeln!(writer, "Paused {}", activity_name(engine))?;
    } else {
        writeln!(writer, "Already paused")?;
    }
    Ok(())
}

pub fn resume<P: Persistence + 'static, W: Write>(
    writer: &mut W,
    engine: &mut Engine<P>,
) -> Result<()> {
    require_session(engine)?;
    if engine.resume() {
        writeln!(writer, "Resumed {}", activity_name(engine))?;
    } else {
        writeln!(writer, "Not paused")?;
    }
    Ok(())
}

pub fn stop<P: Persistence + 'static, W: Write>(
    writer: &mut W,
    engine: &mut Engine<P>,
) -> Result<()> {
    require_session(engine)?;
    let name = activity_name(engine);
    let completion = engine.stop()?;
    writeln!(
        writer,
        "Stopped {name} after {}",
        format_duration(completion.session.duration_ms)
    )?;
    if let Some(err) = completion.commit_error {
        writeln!(writer, "Warning: session recorded without updating totals: {err}")?;
    }
    Ok(())
}

fn require_session<P: Persistence + 'static>(engine: &Engine<P>) -> Result<()> {
    if engine.state() == TimerState::Idle {
        anyhow::bail!("No session in progress. Start one with 'ft start <activity>'.");
    }
    Ok(())
}

/// Name of the session's activity, or its ID if it was removed.
pub(crate) fn activity_name<P: Persistence + 'static>(engine: &Engine<P>) -> String {
    let Some(session) = engine.timer().session() else {
        return String::new();
    };
    engine
        .ledger()
        .activity(&session.activity_id)
        .map_or_else(|| session.activity_id.to_string(), |a| a.name.clone())
}
