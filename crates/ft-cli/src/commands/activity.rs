//! Activity management commands.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use ft_core::{Activity, ActivityId};
use ft_store::{Persistence, SessionStore};

use super::report::format_duration;
use super::util::resolve_activity;

/// Activity as listed by `ft activity list --json`.
#[derive(Debug, Serialize)]
pub struct JsonActivity<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub total_time_ms: i64,
    pub last_used: String,
    pub order: i64,
    pub selected: bool,
}

pub fn add<P: Persistence, W: Write>(
    writer: &mut W,
    store: &mut SessionStore<P>,
    name: &str,
) -> Result<()> {
    let activity = store.add_activity(name)?;
    store.set_first_time(false);
    writeln!(writer, "Added {} ({})", activity.name, activity.id)?;
    Ok(())
}

pub fn list<P: Persistence, W: Write>(
    writer: &mut W,
    store: &SessionStore<P>,
    json: bool,
) -> Result<()> {
    let activities = store.activities();
    let selected = store.selected_activities();

    if json {
        let entries: Vec<JsonActivity<'_>> = activities
            .iter()
            .map(|a| JsonActivity {
                id: a.id.as_str(),
                name: &a.name,
                total_time_ms: a.total_time_ms,
                last_used: a.last_used.to_rfc3339(),
                order: a.order,
                selected: selected.contains(&a.id),
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    if activities.is_empty() {
        writeln!(writer, "No activities yet. Add one with 'ft activity add <name>'.")?;
        return Ok(());
    }

    for activity in activities {
        let marker = if selected.contains(&activity.id) { "*" } else { " " };
        writeln!(
            writer,
            "{marker} {:<24} {:>8}  {}",
            activity.name,
            format_duration(activity.total_time_ms),
            activity.id
        )?;
    }
    Ok(())
}

pub fn rename<P: Persistence, W: Write>(
    writer: &mut W,
    store: &mut SessionStore<P>,
    query: &str,
    name: &str,
) -> Result<()> {
    let id = resolve_activity(store, query)?;
    store.rename_activity(&id, name)?;
    writeln!(writer, "Renamed {id} to {}", name.trim())?;
    Ok(())
}

pub fn remove<P: Persistence, W: Write>(
    writer: &mut W,
    store: &mut SessionStore<P>,
    query: &str,
) -> Result<()> {
    let id = resolve_activity(store, query)?;
    if store
        .current_session()
        .is_some_and(|session| session.activity_id == id)
    {
        anyhow::bail!("Cannot remove an activity while its session is in progress. Run 'ft stop' first.");
    }
    let removed: Activity = store.remove_activity(&id)?;
    writeln!(writer, "Removed {} (recorded sessions kept)", removed.name)?;
    Ok(())
}

pub fn reorder<P: Persistence, W: Write>(
    writer: &mut W,
    store: &mut SessionStore<P>,
    queries: &[String],
) -> Result<()> {
    let ids = resolve_all(store, queries)?;
    store.reorder_activities(&ids)?;
    list(writer, store, false)
}

pub fn select<P: Persistence, W: Write>(
    writer: &mut W,
    store: &mut SessionStore<P>,
    queries: &[String],
) -> Result<()> {
    let ids = resolve_all(store, queries)?;
    store.select_activities(&ids)?;
    if ids.is_empty() {
        writeln!(writer, "Reports include all activities")?;
    } else {
        writeln!(writer, "Reports limited to {} activities", ids.len())?;
    }
    Ok(())
}

fn resolve_all<P: Persistence>(
    store: &SessionStore<P>,
    queries: &[String],
) -> Result<Vec<ActivityId>> {
    queries
        .iter()
        .map(|query| resolve_activity(store, query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use ft_core::ManualClock;
    use ft_store::{MemoryStorage, RetryPolicy};
    use insta::assert_snapshot;

    fn store() -> SessionStore<MemoryStorage> {
        let now = DateTime::parse_from_rfc3339("2025-03-10T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        SessionStore::open(
            MemoryStorage::new(),
            Arc::new(ManualClock::new(now)),
            RetryPolicy::default(),
        )
        .unwrap()
    }

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut output = Vec::new();
        f(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn add_clears_first_time_flag() {
        let mut store = store();
        assert!(store.is_first_time());
        let output = run(|w| add(w, &mut store, "Reading"));
        assert!(output.starts_with("Added Reading ("));
        assert!(!store.is_first_time());
    }

    #[test]
    fn list_empty_prints_hint() {
        let store = store();
        let output = run(|w| list(w, &store, false));
        assert_snapshot!(output, @"No activities yet. Add one with 'ft activity add <name>'.");
    }

    #[test]
    fn reorder_and_select_by_name() {
        let mut store = store();
        let reading = store.add_activity("Reading").unwrap();
        let writing = store.add_activity("Writing").unwrap();

        run(|w| reorder(w, &mut store, &["writing".to_string()]));
        let names: Vec<&str> = store.activities().into_iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Writing", "Reading"]);

        let output = run(|w| select(w, &mut store, &["READING".to_string()]));
        assert_eq!(output, "Reports limited to 1 activities\n");
        assert_eq!(store.selected_activities(), &[reading.id.clone()]);

        let listed = run(|w| list(w, &store, true));
        let value: serde_json::Value = serde_json::from_str(&listed).unwrap();
        assert_eq!(value[0]["id"], writing.id.as_str());
        assert_eq!(value[0]["selected"], false);
        assert_eq!(value[1]["selected"], true);
    }

    #[test]
    fn unknown_activity_is_reported() {
        let mut store = store();
        let mut output = Vec::new();
        let err = rename(&mut output, &mut store, "nothing", "x").unwrap_err();
        assert!(err.to_string().contains("No activity matches 'nothing'"));
    }
}
