//! End-to-end tests for the `ft` binary.
//!
//! Each test points the binary at a temporary database through a config file and
//! drives it the way a user would, one process per command.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::{NamedTempFile, TempDir};

struct Workspace {
    _dir: TempDir,
    config: NamedTempFile,
}

impl Workspace {
    fn new() -> Self {
        Self::with_tick_period(100)
    }

    fn with_tick_period(tick_period_ms: i64) -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("data").join("ft.db");

        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, r#"database_path = "{}""#, db_path.display()).unwrap();
        writeln!(config, "tick_period_ms = {tick_period_ms}").unwrap();
        config.flush().unwrap();

        Self { _dir: dir, config }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_ft"));
        command.arg("--config").arg(self.config.path());
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("failed to run ft")
    }

    fn ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "ft {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }

    fn config_path(&self) -> &Path {
        self.config.path()
    }
}

#[test]
fn test_activity_management() {
    let ws = Workspace::new();
    assert!(ws.ok(&["activity", "add", "Reading"]).starts_with("Added Reading"));
    ws.ok(&["activity", "add", "Writing"]);
    ws.ok(&["activity", "rename", "writing", "Drafting"]);
    ws.ok(&["activity", "reorder", "Drafting"]);

    let listed: serde_json::Value =
        serde_json::from_str(&ws.ok(&["activity", "list", "--json"])).unwrap();
    assert_eq!(listed[0]["name"], "Drafting");
    assert_eq!(listed[1]["name"], "Reading");
    assert_eq!(listed[0]["total_time_ms"], 0);

    ws.ok(&["activity", "remove", "reading"]);
    let listed: serde_json::Value =
        serde_json::from_str(&ws.ok(&["activity", "list", "--json"])).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn test_session_flow_records_report() {
    let ws = Workspace::new();
    ws.ok(&["activity", "add", "Reading"]);

    assert_eq!(
        ws.ok(&["start", "reading", "--target", "25m"]),
        "Started Reading (goal 25m)\n"
    );
    let status = ws.ok(&["status"]);
    assert!(status.starts_with("Reading (running)"), "{status}");

    // A second session cannot start while one is in progress.
    let output = ws.run(&["start", "Reading"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already in progress"));

    assert_eq!(ws.ok(&["pause"]), "Paused Reading\n");
    assert!(ws.ok(&["status"]).starts_with("Reading (paused)"));
    assert_eq!(ws.ok(&["resume"]), "Resumed Reading\n");

    let stopped = ws.ok(&["stop"]);
    assert!(stopped.contains("Stopped Reading after 0m"), "{stopped}");
    assert!(ws.ok(&["status"]).starts_with("No session in progress."));

    let report: serde_json::Value =
        serde_json::from_str(&ws.ok(&["report", "--day", "--json"])).unwrap();
    assert_eq!(report["period"]["type"], "day");
    assert_eq!(report["totals"]["session_count"], 1);
    assert_eq!(report["activities"][0]["name"], "Reading");
}

#[test]
fn test_watch_stops_on_command() {
    let ws = Workspace::new();
    ws.ok(&["activity", "add", "Reading"]);
    ws.ok(&["start", "Reading"]);

    let mut child = ws
        .command()
        .arg("watch")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn ft watch");
    {
        let stdin = child.stdin.as_mut().unwrap();
        stdin.write_all(b"pause\nstop\n").unwrap();
    }
    drop(child.stdin.take());

    let output = child.wait_with_output().expect("failed to wait for ft watch");
    assert!(
        output.status.success(),
        "watch failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Reading: 0m (running)"), "{stdout}");
    assert!(stdout.contains("Paused Reading"), "{stdout}");
    assert!(stdout.contains("Stopped Reading"), "{stdout}");
    assert!(stdout.contains("Session complete: 0m of Reading"), "{stdout}");

    assert!(ws.ok(&["status"]).starts_with("No session in progress."));
}

#[test]
fn test_commands_without_session_fail() {
    let ws = Workspace::new();
    for command in ["pause", "resume", "stop", "watch"] {
        let output = ws.run(&[command]);
        assert!(!output.status.success(), "ft {command} should fail");
        assert!(
            String::from_utf8_lossy(&output.stderr).contains("No session in progress"),
            "unexpected error for {command}"
        );
    }
}

#[test]
fn test_invalid_config_is_reported() {
    let ws = Workspace::new();
    let mut config = std::fs::OpenOptions::new()
        .append(true)
        .open(ws.config_path())
        .unwrap();
    writeln!(config, "tick_period_ms = \"soon\"").unwrap();

    let output = ws.run(&["status"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load configuration"));
}

#[test]
fn test_zero_tick_period_leaves_no_session() {
    let broken = Workspace::with_tick_period(0);
    broken.ok(&["activity", "add", "Reading"]);

    let output = broken.run(&["start", "Reading"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid engine configuration"));

    let report: serde_json::Value =
        serde_json::from_str(&broken.ok(&["report", "--day", "--json"])).unwrap();
    assert_eq!(report["totals"]["session_count"], 0);
}
