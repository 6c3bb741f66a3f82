//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;

use ft_core::ActivityId;
use ft_store::{Persistence, SessionStore};

/// Pre-compiled regex for durations like `90s`, `25m`, `1h30m`.
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?\s*(?:(\d+)m)?\s*(?:(\d+)s)?$").expect("duration regex is valid")
});

/// Conservative upper bound for a session target (one week).
const MAX_DURATION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Parse a duration such as `90s`, `25m`, `1h` or `1h30m` into milliseconds.
///
/// A bare number is read as minutes.
pub fn parse_duration(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if let Ok(minutes) = s.parse::<i64>() {
        return checked_duration(minutes.checked_mul(60_000), s);
    }

    let caps = DURATION_RE
        .captures(s)
        .filter(|caps| caps.iter().skip(1).any(|group| group.is_some()))
        .with_context(|| format!("Invalid duration: {s}. Use e.g. 90s, 25m, 1h or 1h30m"))?;

    let mut total: Option<i64> = Some(0);
    for (index, unit_ms) in [(1, 3_600_000_i64), (2, 60_000), (3, 1_000)] {
        if let Some(group) = caps.get(index) {
            let n: i64 = group
                .as_str()
                .parse()
                .context("failed to parse number in duration")?;
            total = total
                .and_then(|t| n.checked_mul(unit_ms).and_then(|ms| t.checked_add(ms)));
        }
    }
    checked_duration(total, s)
}

fn checked_duration(ms: Option<i64>, input: &str) -> anyhow::Result<i64> {
    match ms {
        Some(ms) if ms > 0 && ms <= MAX_DURATION_MS => Ok(ms),
        Some(ms) if ms <= 0 => anyhow::bail!("Duration must be positive: {input}"),
        _ => anyhow::bail!("Duration too large: {input}"),
    }
}

/// Resolve an activity by ID or case-insensitive name.
pub fn resolve_activity<P: Persistence>(
    store: &SessionStore<P>,
    query: &str,
) -> anyhow::Result<ActivityId> {
    store
        .find_activity(query)
        .map(|activity| activity.id.clone())
        .with_context(|| format!("No activity matches '{query}'. Run 'ft activity list'."))
}

/// Formats milliseconds as a clock reading, `M:SS` or `H:MM:SS`.
pub fn format_clock(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1_000;
    let hours = total_seconds / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Writes any change the store could not persist yet.
pub fn flush_store<P: Persistence>(store: &mut SessionStore<P>) -> anyhow::Result<()> {
    if store.pending_write().is_some() {
        store.flush().context("failed to save store")?;
    }
    Ok(())
}
