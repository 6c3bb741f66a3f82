//! Report command for generating time reports.
//!
//! This module implements `ft report` with various period options
//! (--week, --last-week, --day, --last-day) and output formats (human-readable, JSON).
//! Only committed sessions count; the session in progress shows up in `ft status`.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Datelike, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use ft_core::ActivityId;
use ft_store::{Persistence, SessionStore, activity_totals};

/// Report period type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    LastWeek,
    Day,
    LastDay,
}

/// Period type for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Week,
    Day,
}

/// Time spent on one activity within the period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTotal {
    pub activity_id: ActivityId,
    /// `None` when the activity has since been removed.
    pub name: Option<String>,
    pub total_ms: i64,
    pub sessions: usize,
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub period_type: PeriodType,
    pub timezone: String,
    /// Whether the report is limited to the selected activities.
    pub selected_only: bool,
    pub activities: Vec<ActivityTotal>,
}

// ========== Period Date Calculation ==========

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::default());
    match Local.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight; fall back to the UTC reading
            // of the same wall-clock time, which is at most an hour off.
            Utc.from_utc_datetime(&midnight)
        }
    }
}

/// Calculates week boundaries (Mon 00:00 to next Mon 00:00 local time) as half-open interval.
fn week_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_since_monday = today.weekday().num_days_from_monday();
    let monday = today - chrono::Duration::days(i64::from(days_since_monday));
    let next_monday = monday + chrono::Duration::days(7);

    let start = local_midnight_to_utc(monday);
    let end = local_midnight_to_utc(next_monday);
    (start, end)
}

/// Calculates last week boundaries (previous Mon 00:00 to this Mon 00:00 local time).
fn last_week_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_since_monday = today.weekday().num_days_from_monday();
    let this_monday = today - chrono::Duration::days(i64::from(days_since_monday));
    let last_monday = this_monday - chrono::Duration::days(7);

    let start = local_midnight_to_utc(last_monday);
    let end = local_midnight_to_utc(this_monday);
    (start, end)
}

/// Calculates day boundaries (today 00:00 to tomorrow 00:00 local time).
fn day_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let tomorrow = today + chrono::Duration::days(1);

    let start = local_midnight_to_utc(today);
    let end = local_midnight_to_utc(tomorrow);
    (start, end)
}

/// Calculates yesterday boundaries (yesterday 00:00 to today 00:00 local time).
fn last_day_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let yesterday = today - chrono::Duration::days(1);

    let start = local_midnight_to_utc(yesterday);
    let end = local_midnight_to_utc(today);
    (start, end)
}

/// Get boundaries for a given period, using the provided date as reference.
pub fn get_period_boundaries(period: Period, today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    match period {
        Period::Week => week_boundaries(today),
        Period::LastWeek => last_week_boundaries(today),
        Period::Day => day_boundaries(today),
        Period::LastDay => last_day_boundaries(today),
    }
}

// ========== Duration Formatting ==========

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are shown as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Report Generation ==========

/// Generates report data from the store.
pub fn generate_report_data<P: Persistence>(
    store: &SessionStore<P>,
    period: Period,
    today: NaiveDate,
    generated_at: DateTime<Utc>,
) -> ReportData {
    let (period_start, period_end) = get_period_boundaries(period, today);

    let period_type = match period {
        Period::Week | Period::LastWeek => PeriodType::Week,
        Period::Day | Period::LastDay => PeriodType::Day,
    };

    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    let selected = store.selected_activities();
    let sessions: Vec<_> = store
        .sessions_within_interval(period_start, period_end)
        .into_iter()
        .filter(|s| selected.is_empty() || selected.contains(&s.activity_id))
        .collect();

    let totals = activity_totals(sessions.iter().copied());
    let mut activities: Vec<ActivityTotal> = totals
        .into_iter()
        .filter(|(_, total_ms)| *total_ms > 0) // Exclude zero-time
        .map(|(activity_id, total_ms)| ActivityTotal {
            name: store.activity(&activity_id).map(|a| a.name.clone()),
            sessions: sessions
                .iter()
                .filter(|s| s.activity_id == activity_id)
                .count(),
            activity_id,
            total_ms,
        })
        .collect();
    activities.sort_by(|a, b| {
        b.total_ms
            .cmp(&a.total_ms)
            .then_with(|| a.name.cmp(&b.name))
    });

    ReportData {
        generated_at,
        period_start,
        period_end,
        period_type,
        timezone,
        selected_only: !selected.is_empty(),
        activities,
    }
}

/// Formats the period description for the report header.
fn format_period_description(report_data: &ReportData) -> String {
    // Convert period_start from UTC to local for display
    let local_start = report_data.period_start.with_timezone(&Local);
    let start_date = local_start.date_naive();

    match report_data.period_type {
        PeriodType::Week => {
            // "Week of Jan 27, 2025"
            format!("Week of {}", start_date.format("%b %-d, %Y"))
        }
        PeriodType::Day => {
            // "Wednesday, Jan 29, 2025"
            format!("{}", start_date.format("%A, %b %-d, %Y"))
        }
    }
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    let period_desc = format_period_description(data);
    writeln!(output, "TIME REPORT: {period_desc}")?;
    if data.selected_only {
        writeln!(output, "(selected activities only)")?;
    }

    if data.activities.is_empty() {
        let period_word = match data.period_type {
            PeriodType::Week => "week",
            PeriodType::Day => "day",
        };
        writeln!(output)?;
        writeln!(output, "No sessions recorded this {period_word}.")?;
        writeln!(output)?;
        writeln!(output, "Hint: Run 'ft start <activity>' to begin a session.")?;
        return Ok(output);
    }

    let total_time: i64 = data.activities.iter().map(|a| a.total_ms).sum();
    let total_sessions: usize = data.activities.iter().map(|a| a.sessions).sum();
    // Bars are scaled to the busiest activity
    let max_total = data.activities.iter().map(|a| a.total_ms).max().unwrap_or(0);

    writeln!(output)?;
    writeln!(output, "BY ACTIVITY")?;
    writeln!(output, "───────────")?;
    for activity in &data.activities {
        let name = activity.name.as_deref().unwrap_or("(removed)");
        let duration = format_duration(activity.total_ms);
        let bar = progress_bar(activity.total_ms, max_total);
        let sessions = plural(activity.sessions, "session");
        writeln!(output, "{name:<24} {duration:>7}  {bar}  ({sessions})")?;
    }

    writeln!(output)?;
    writeln!(output, "SUMMARY")?;
    writeln!(output, "───────")?;
    writeln!(output, "Total focused:  {}", format_duration(total_time))?;
    writeln!(output, "Sessions:       {total_sessions}")?;

    Ok(output)
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub generated_at: String,
    pub timezone: String,
    pub period: JsonPeriod,
    pub selected_only: bool,
    pub activities: Vec<JsonActivityTotal>,
    pub totals: JsonTotals,
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    pub start: String,
    pub end: String,
    #[serde(rename = "type")]
    pub period_type: PeriodType,
}

#[derive(Debug, Serialize)]
pub struct JsonActivityTotal {
    pub id: String,
    pub name: Option<String>,
    pub time_ms: i64,
    pub sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct JsonTotals {
    pub time_ms: i64,
    pub session_count: usize,
    pub activity_count: usize,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let local_start = data.period_start.with_timezone(&Local);
    let local_end = data.period_end.with_timezone(&Local);

    // period_end is the first moment of the next period; report the last day inside it
    let end_date = (local_end.date_naive() - chrono::Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();

    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: data.timezone.clone(),
        period: JsonPeriod {
            start: local_start.date_naive().format("%Y-%m-%d").to_string(),
            end: end_date,
            period_type: data.period_type,
        },
        selected_only: data.selected_only,
        activities: data
            .activities
            .iter()
            .map(|a| JsonActivityTotal {
                id: a.activity_id.to_string(),
                name: a.name.clone(),
                time_ms: a.total_ms,
                sessions: a.sessions,
            })
            .collect(),
        totals: JsonTotals {
            time_ms: data.activities.iter().map(|a| a.total_ms).sum(),
            session_count: data.activities.iter().map(|a| a.sessions).sum(),
            activity_count: data.activities.len(),
        },
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<P: Persistence, W: Write>(
    writer: &mut W,
    store: &SessionStore<P>,
    period: Period,
    json: bool,
) -> Result<()> {
    let generated_at = Utc::now();
    let today = Local::now().date_naive();
    let data = generate_report_data(store, period, today, generated_at);

    if json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        write!(writer, "{}", format_report(&data)?)?;
    }

    Ok(())
}
