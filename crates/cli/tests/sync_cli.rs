use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const NOW: &str = "2024-03-01T18:30:00Z";

// The timeline starts at local midnight one day back (2024-02-28T23:00Z at
// UTC+1); 19:00Z today is 44 hours later at 400 points per hour.
const SCROLL_X_19H: &str = "17600";

fn write_fixture(root: &Path) -> PathBuf {
    let path = root.join("guide.json");
    fs::write(
        &path,
        r#"{
  "channels": [
    {"id": "ard", "name": "Das Erste"},
    {"id": "zdf", "name": "ZDF"},
    {"id": "arte", "name": "Arte"}
  ],
  "events": [
    {"id": "ard-tatort", "channel_id": "ard", "start_time": "2024-03-01T19:15:00Z",
     "end_time": "2024-03-01T20:45:00Z", "title": "Tatort"},
    {"id": "zdf-heute", "channel_id": "zdf", "start_time": "2024-03-01T19:00:00Z",
     "end_time": "2024-03-01T19:30:00Z", "title": "heute"},
    {"id": "zdf-old", "channel_id": "zdf", "start_time": "2024-02-28T10:00:00Z",
     "end_time": "2024-02-28T11:00:00Z", "title": "Out of range"}
  ],
  "recording_statuses": [{"event_id": "ard-tatort", "state": "scheduled"}],
  "channel_lists": [{"id": "news", "name": "News", "channel_ids": ["zdf"]}]
}"#,
    )
    .expect("write fixture");
    path
}

fn write_config(root: &Path) -> PathBuf {
    let path = root.join("gridguide.toml");
    fs::write(&path, "[sync]\nsettle_ms = 0\nworker_threads = 2\n").expect("write config");
    path
}

fn gridguide(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gridguide"));
    cmd.arg("--config")
        .arg(write_config(root))
        .env("HOME", root)
        .env("XDG_CONFIG_HOME", root.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn sync_command(root: &Path) -> Command {
    let mut cmd = gridguide(root);
    cmd.arg("sync")
        .arg("--fixture")
        .arg(write_fixture(root))
        .arg("--now")
        .arg(NOW)
        .arg("--scroll-x")
        .arg(SCROLL_X_19H);
    cmd
}

fn stdout_of(output: &Output) -> String {
    if !output.status.success() {
        panic!(
            "gridguide failed\nstatus: {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8(output.stdout.clone()).expect("utf8 stdout")
}

fn parse_json_output(output: &Output) -> Value {
    serde_json::from_str(&stdout_of(output)).expect("sync json output")
}

fn channel_ids(json: &Value) -> Vec<String> {
    json["snapshot"]["channels"]
        .as_array()
        .expect("channels array")
        .iter()
        .filter_map(|entry| entry["channel"]["id"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn sync_prints_the_settled_snapshot_as_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = sync_command(temp.path())
        .args(["--format", "json"])
        .output()
        .expect("run gridguide sync");
    let json = parse_json_output(&output);

    let snapshot = &json["snapshot"];
    assert_eq!(snapshot["state"]["state"], "ready");
    assert_eq!(channel_ids(&json), vec!["ard", "zdf", "arte"]);

    let ard = &snapshot["channels"][0]["events"];
    assert_eq!(ard[0]["event"]["title"], "Tatort");
    assert_eq!(ard[0]["recording_status"]["state"], "scheduled");

    let zdf = snapshot["channels"][1]["events"].as_array().expect("events");
    assert_eq!(zdf.len(), 1);
    assert_eq!(zdf[0]["event"]["title"], "heute");

    assert_eq!(snapshot["visible_range"]["start"], "2024-03-01T19:00:00Z");
    assert_eq!(snapshot["jump_marks"]["left"]["anchor"], "now");
    assert!(snapshot["jump_marks"]["right"].is_null());
    assert!(snapshot.get("errors").is_none());
    assert_eq!(json["stats"]["rounds_applied"], 2);
}

#[test]
fn sync_applies_filter_and_search() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = sync_command(temp.path())
        .args(["--filter", "news", "--format", "json"])
        .output()
        .expect("run gridguide sync");
    assert_eq!(channel_ids(&parse_json_output(&output)), vec!["zdf"]);

    let output = sync_command(temp.path())
        .args(["--search", "das er", "--format", "json"])
        .output()
        .expect("run gridguide sync");
    assert_eq!(channel_ids(&parse_json_output(&output)), vec!["ard"]);
}

#[test]
fn sync_text_output_lists_window_channels() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = sync_command(temp.path())
        .output()
        .expect("run gridguide sync");
    let text = stdout_of(&output);

    assert!(text.contains("(ready)"), "{text}");
    assert!(text.contains("Window: channels 0..3 (3 of 3)"), "{text}");
    assert!(text.contains("19:15–20:45  Tatort  [scheduled]"), "{text}");
    assert!(text.contains("Arte [arte]\n  (no events)"), "{text}");
}

#[test]
fn sync_reports_unknown_channel_list() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = sync_command(temp.path())
        .args(["--filter", "sports"])
        .output()
        .expect("run gridguide sync");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Unknown channel list \"sports\""), "{stderr}");
}

#[test]
fn marks_and_window_print_layout_math() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = gridguide(temp.path())
        .args([
            "marks",
            "--left",
            "2024-03-01T20:00:00Z",
            "--right",
            "2024-03-01T23:00:00Z",
            "--now",
            NOW,
        ])
        .output()
        .expect("run gridguide marks");
    assert_eq!(
        stdout_of(&output).trim(),
        "left: prime time (2024-03-01 19:15 UTC), right: hidden, current time off screen"
    );

    let output = gridguide(temp.path())
        .args(["window", "--scroll-y", "600", "--height", "300", "--total", "100"])
        .output()
        .expect("run gridguide window");
    assert_eq!(stdout_of(&output).trim(), "channels 9..17 (8 of 100)");
}

#[test]
fn config_prints_effective_values() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = gridguide(temp.path())
        .arg("config")
        .output()
        .expect("run gridguide config");
    let text = stdout_of(&output);

    assert!(text.starts_with("# Loaded from "), "{text}");
    assert!(text.contains("settle_ms = 0"), "{text}");
    assert!(text.contains("row_height = 60.0"), "{text}");
}
