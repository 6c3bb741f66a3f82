//! Foreground loop that drives the session while the terminal is open.
//!
//! The loop sleeps until the next tick is due, runs it, and prints progress once
//! per minute of active time. A wall-clock jump larger than `suspend_gap_ms`
//! between two iterations means the machine slept; the missed interval is routed
//! through the engine's suspension handling so ticks missed in the background are
//! caught up and the time keeps counting as active.
//!
//! Standard input accepts `pause`, `resume`, `stop` and `quit`.

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};

use ft_core::TickReport;
use ft_core::clock::millis_between;
use ft_store::Persistence;

use super::report::format_duration;
use super::session::{self, Engine, activity_name};
use super::util::flush_store;
use crate::Config;

/// A command typed while watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pause,
    Resume,
    Stop,
    Quit,
}

impl Control {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Self::Pause),
            "r" | "resume" => Some(Self::Resume),
            "s" | "stop" => Some(Self::Stop),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Whether the watch loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Tracks wall-clock progress between loop iterations.
#[derive(Debug)]
pub struct Watcher {
    last_seen: DateTime<Utc>,
    suspend_gap_ms: i64,
    last_minute: Option<i64>,
}

impl Watcher {
    pub const fn new(now: DateTime<Utc>, suspend_gap_ms: i64) -> Self {
        Self {
            last_seen: now,
            suspend_gap_ms,
            last_minute: None,
        }
    }

    /// Brings the engine up to the current time.
    pub fn advance<P: Persistence + 'static>(&mut self, engine: &mut Engine<P>) -> TickReport {
        let now = engine.now();
        let gap_ms = millis_between(self.last_seen, now);
        let report = if gap_ms > self.suspend_gap_ms {
            tracing::info!(gap_ms, since = %self.last_seen, "wall-clock gap; treating as suspension");
            engine.on_suspend_at(self.last_seen);
            engine.on_resume()
        } else {
            engine.tick()
        };
        self.last_seen = now;
        report
    }

    /// A progress line whenever the active minute changes.
    pub fn progress_line<P: Persistence + 'static>(&mut self, engine: &Engine<P>) -> Option<String> {
        if !engine.state().is_active() {
            return None;
        }
        let active_ms = engine.elapsed_active_ms().ok()?;
        let minute = active_ms / 60_000;
        if self.last_minute == Some(minute) {
            return None;
        }
        self.last_minute = Some(minute);

        let name = activity_name(engine);
        let target = engine.timer().session().and_then(|s| s.target_ms);
        let line = match target {
            Some(target_ms) => format!(
                "{name}: {} / {} ({})",
                format_duration(active_ms),
                format_duration(target_ms),
                engine.state()
            ),
            None => format!("{name}: {} ({})", format_duration(active_ms), engine.state()),
        };
        Some(line)
    }
}

/// Applies a typed command.
pub fn handle<P: Persistence + 'static, W: Write>(
    writer: &mut W,
    engine: &mut Engine<P>,
    control: Control,
) -> Result<Flow> {
    match control {
        Control::Pause => session::pause(writer, engine)?,
        Control::Resume => session::resume(writer, engine)?,
        Control::Stop => {
            session::stop(writer, engine)?;
            return Ok(Flow::Exit);
        }
        Control::Quit => {
            writeln!(writer, "Detached; the session keeps running.")?;
            return Ok(Flow::Exit);
        }
    }
    Ok(Flow::Continue)
}

/// Forwards stdin lines to the loop. The channel disconnects at end of input.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Time until the next tick, bounded by the tick period.
fn wait_time<P: Persistence + 'static>(engine: &Engine<P>, tick_period_ms: i64) -> Duration {
    let period = Duration::from_millis(u64::try_from(tick_period_ms).unwrap_or(1_000));
    engine
        .next_tick_due()
        .and_then(|due| (due - engine.now()).to_std().ok())
        .map_or(period, |wait| wait.min(period))
}

pub fn run<P: Persistence + 'static, W: Write>(
    writer: &mut W,
    engine: &mut Engine<P>,
    config: &Config,
) -> Result<()> {
    if !engine.state().is_active() {
        anyhow::bail!("No session in progress. Start one with 'ft start <activity>'.");
    }

    let input = spawn_stdin_reader();
    let mut input_open = true;
    let mut watcher = Watcher::new(engine.now(), config.suspend_gap_ms);
    if let Some(line) = watcher.progress_line(engine) {
        writeln!(writer, "{line}")?;
    }

    loop {
        let wait = wait_time(engine, config.tick_period_ms);
        let line = if input_open {
            match input.recv_timeout(wait) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("stdin closed; watching without input");
                    input_open = false;
                    None
                }
            }
        } else {
            std::thread::sleep(wait);
            None
        };

        if let Some(line) = line {
            match Control::parse(&line) {
                Some(control) => {
                    if handle(writer, engine, control)? == Flow::Exit {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => writeln!(writer, "Commands: pause, resume, stop, quit")?,
            }
        }

        let report = watcher.advance(engine);
        if !report.failures.is_empty() {
            tracing::warn!(failures = report.failures.len(), "tick callbacks failed");
        }
        if let Some(line) = watcher.progress_line(engine) {
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
        if !engine.state().is_active() {
            break;
        }
    }

    flush_store(engine.ledger_mut())
}
