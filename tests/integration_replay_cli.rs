// Integration tests that drive the compiled binary over pipes: replay a
// recorded edit log on the virtual clock, then inspect the persisted state
// through the summary and reset subcommands. No TTY involved.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;

const SESSION_LOG: &str = concat!(
    r#"{"atMs":1000,"changes":[{"text":"h"}]}"#,
    "\n",
    r#"{"atMs":1500,"changes":[{"text":"i"}]}"#,
    "\n",
    r#"{"atMs":2500,"changes":[{"text":" "}]}"#,
    "\n",
    r#"{"atMs":6400,"changes":[{"text":"f"},{"text":"a"},{"text":"s"},{"text":"t"}]}"#,
    "\n",
);

fn keytempo(state: &Path, config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("keytempo").unwrap();
    cmd.arg("--state")
        .arg(state)
        .arg("--config")
        .arg(config_dir.join("config.json"));
    cmd
}

#[test]
fn replay_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("session.ndjson");
    fs::write(&log, SESSION_LOG).unwrap();

    let run = || {
        keytempo(Path::new(":memory:"), dir.path())
            .arg("replay")
            .arg(&log)
            .output()
            .unwrap()
    };

    let first = run();
    let second = run();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn replay_emits_the_expected_message_stream() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("session.ndjson");
    fs::write(&log, SESSION_LOG).unwrap();

    let output = keytempo(Path::new(":memory:"), dir.path())
        .arg("replay")
        .arg(&log)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 14);

    // the attach handshake comes first: a speed update and a counter snapshot
    assert_eq!(lines[0]["command"], "update");
    assert_eq!(lines[0]["wpm"], 0);
    assert_eq!(lines[1]["command"], "initKeyboardHeatmap");

    // estimates across the session, including the tick-driven decay to zero
    let wpms: Vec<i64> = lines
        .iter()
        .filter(|l| l["command"] == "update")
        .map(|l| l["wpm"].as_i64().unwrap())
        .collect();
    assert_eq!(wpms, vec![0, 12, 16, 12, 14, 9, 0, 13]);

    // the mid-session resync carries every counter seen so far
    let snapshots: Vec<&Value> = lines
        .iter()
        .filter(|l| l["command"] == "initKeyboardHeatmap")
        .collect();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[1]["keyPressData"]["h"], 1);
    assert_eq!(snapshots[1]["keyPressData"]["space"], 1);

    // each single-character insert produced a key delta
    let deltas = lines
        .iter()
        .filter(|l| l["command"] == "updateKeyHeat")
        .count();
    assert_eq!(deltas, 4);
}

#[test]
fn replay_then_summary_reads_persisted_history() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.db");
    let log = dir.path().join("session.ndjson");
    fs::write(&log, SESSION_LOG).unwrap();

    keytempo(&state, dir.path())
        .arg("replay")
        .arg(&log)
        .assert()
        .success();

    keytempo(&state, dir.path())
        .args(["summary", "--range", "all-time"])
        .assert()
        .success()
        .stdout(
            "range: all-time\n\
             samples: 6\n\
             peak: 13 wpm\n\
             average: 12.7 wpm\n\
             std dev: 2.13\n",
        );
}

#[test]
fn reset_clears_the_persisted_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.db");
    let log = dir.path().join("session.ndjson");
    fs::write(&log, SESSION_LOG).unwrap();

    keytempo(&state, dir.path())
        .arg("replay")
        .arg(&log)
        .assert()
        .success();

    keytempo(&state, dir.path())
        .arg("reset")
        .assert()
        .success()
        .stdout("cleared persisted telemetry\n");

    keytempo(&state, dir.path())
        .args(["summary", "--range", "all-time"])
        .assert()
        .success()
        .stdout(
            "range: all-time\n\
             samples: 0\n\
             peak: 0 wpm\n\
             average: 0.0 wpm\n\
             std dev: 0.00\n",
        );
}

#[test]
fn summary_on_a_fresh_store_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    keytempo(Path::new(":memory:"), dir.path())
        .arg("summary")
        .assert()
        .success()
        .stdout(
            "range: all-time\n\
             samples: 0\n\
             peak: 0 wpm\n\
             average: 0.0 wpm\n\
             std dev: 0.00\n",
        );
}

#[test]
fn run_mode_processes_stdin_until_eof() {
    let dir = tempfile::tempdir().unwrap();

    let output = keytempo(Path::new(":memory:"), dir.path())
        .arg("run")
        .write_stdin(concat!(
            r#"{"changes":[{"text":"a"}]}"#,
            "\n",
            r#"{"command":"showHistory","history":[]}"#,
            "\n",
        ))
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("\"command\":\"update\""));
    assert!(stdout.contains("\"command\":\"updateKeyHeat\""));
    // the history request is answered from the engine's own series
    assert!(stdout.contains("\"command\":\"showHistory\""));
}
