//! CLI command integration tests.
//! Each test uses a temp directory via HUSH_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn hush_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("hush").unwrap();
    cmd.env("HUSH_DATA_DIR", data_dir.path());
    // Keep tests independent of any hush.toml in the working directory.
    cmd.current_dir(data_dir.path());
    cmd
}

#[test]
fn stats_fresh_store() {
    let dir = TempDir::new().unwrap();
    hush_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("entries:    0"))
        .stdout(predicate::str::contains("connected=true"))
        .stdout(predicate::str::contains("last_sync=never"));
}

#[test]
fn respond_emits_with_open_gate() {
    let dir = TempDir::new().unwrap();
    hush_cmd(&dir)
        .args(["respond", "good morning, anyone there?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("emitted: magnitude="));

    // The turn was registered.
    hush_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("entries:    1"));
}

#[test]
fn respond_empty_input_is_silence() {
    let dir = TempDir::new().unwrap();
    hush_cmd(&dir)
        .args(["respond", "   "])
        .assert()
        .success()
        .stdout(predicate::str::contains("(silence)"));

    hush_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("entries:    0"));
}

#[test]
fn offline_silences_the_gate() {
    let dir = TempDir::new().unwrap();
    hush_cmd(&dir)
        .arg("offline")
        .assert()
        .success()
        .stdout(predicate::str::contains("silence forced to 1.0"));

    // Fresh tension, full silence: every input is suppressed.
    hush_cmd(&dir)
        .args(["respond", "hello? are you still there?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(silence)"));

    hush_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("connected=false"))
        .stdout(predicate::str::contains("silence=1.00"));
}

#[test]
fn online_with_no_sources_runs_clean_pass() {
    let dir = TempDir::new().unwrap();
    hush_cmd(&dir).arg("offline").assert().success();

    hush_cmd(&dir)
        .arg("online")
        .assert()
        .success()
        .stdout(predicate::str::contains("integrated=0, skipped=0, failed=0"));

    // Reconnect relaxed the gate to 0.5 and stamped the sync time.
    hush_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("silence=0.50"))
        .stdout(predicate::str::contains("connected=true"))
        .stdout(predicate::str::contains("last_sync=never").not())
        .stdout(predicate::str::contains("sync_passes: 1"));
}

#[test]
fn source_add_and_list() {
    let dir = TempDir::new().unwrap();

    hush_cmd(&dir)
        .args(["source", "add", "bulletin", "https://example.test/bulletin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("registered bulletin"));

    // Duplicate registration is refused.
    hush_cmd(&dir)
        .args(["source", "add", "bulletin", "https://example.test/other"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already registered"));

    hush_cmd(&dir)
        .args(["source", "add", "notes", "https://example.test/notes"])
        .assert()
        .success();

    hush_cmd(&dir)
        .args(["source", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bulletin  https://example.test/bulletin"))
        .stdout(predicate::str::contains("notes  https://example.test/notes"));
}

#[test]
fn sync_with_unreachable_source_does_not_fail_the_command() {
    let dir = TempDir::new().unwrap();

    // A loopback port nobody listens on: fetch fails, the pass survives.
    hush_cmd(&dir)
        .args(["source", "add", "dead", "http://127.0.0.1:9/nothing"])
        .assert()
        .success();

    hush_cmd(&dir)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("failed=1"))
        .stdout(predicate::str::contains("failed dead:"));
}

#[test]
fn export_import_roundtrip() {
    let dir = TempDir::new().unwrap();

    hush_cmd(&dir)
        .args(["respond", "remember this exchange for later"])
        .assert()
        .success();

    let export_path = dir.path().join("state.json");
    hush_cmd(&dir)
        .arg("export")
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported to"));
    assert!(export_path.exists());

    // Import into a second, empty data dir.
    let dir2 = TempDir::new().unwrap();
    hush_cmd(&dir2)
        .arg("import")
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("entries=1"));

    hush_cmd(&dir2)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("entries:    1"));
}

#[test]
fn config_file_is_honored() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("hush.toml");
    std::fs::write(
        &config_path,
        r#"
agent_name = "quiet-one"

[[sources]]
name = "news"
url = "https://example.test/news"
"#,
    )
    .unwrap();

    hush_cmd(&dir)
        .args(["--config"])
        .arg(&config_path)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("agent:      quiet-one"))
        .stdout(predicate::str::contains("sources:    1"));
}
