//! Corruption recovery tests for trainlog.
//!
//! These tests verify the system can handle:
//! - Corrupted store files (refused, never overwritten)
//! - Corrupted or partial journal lines
//! - Missing and empty files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let config = dir.join("config.toml");
    if !config.exists() {
        fs::write(&config, "").expect("Failed to write config");
    }
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("trainlog"));
    cmd.arg("--data-dir").arg(dir.join("data")).arg("--config").arg(config);
    cmd
}

fn setup_test_dir() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(data_dir.join("journal")).unwrap();
    (temp_dir, data_dir)
}

#[test]
fn test_corrupted_store_is_refused_and_preserved() {
    let (temp_dir, data_dir) = setup_test_dir();

    let store_path = data_dir.join("store.json");
    fs::write(&store_path, "{ invalid json }}}}").expect("Failed to write corrupted store");

    cli(temp_dir.path()).arg("protocols").assert().failure();
    cli(temp_dir.path()).arg("seed").assert().failure();

    // Nothing was written over the damaged file
    assert_eq!(
        fs::read_to_string(&store_path).unwrap(),
        "{ invalid json }}}}"
    );
}

#[test]
fn test_store_recovers_after_manual_fix() {
    let (temp_dir, data_dir) = setup_test_dir();

    let store_path = data_dir.join("store.json");
    fs::write(&store_path, "corrupted").unwrap();
    cli(temp_dir.path()).arg("seed").assert().failure();

    // Moving the damaged file aside is enough to start over
    fs::rename(&store_path, data_dir.join("store.json.bak")).unwrap();
    cli(temp_dir.path())
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 3 protocols"));
}

#[test]
fn test_missing_store_is_empty() {
    let (temp_dir, _) = setup_test_dir();

    cli(temp_dir.path())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions yet"));
}

#[test]
fn test_corrupted_journal_lines_skipped_during_rollup() {
    let (temp_dir, data_dir) = setup_test_dir();

    cli(temp_dir.path()).arg("seed").assert().success();
    cli(temp_dir.path())
        .args(["start", "Daily Mobility", "--auto-complete"])
        .assert()
        .success();

    let journal_path = data_dir.join("journal/sessions.jsonl");
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(&journal_path)
        .unwrap();
    writeln!(file, "{{ invalid json }}").unwrap();
    writeln!(file, "{{ more invalid }}").unwrap();
    drop(file);

    cli(temp_dir.path())
        .args(["start", "Daily Mobility", "--auto-complete"])
        .assert()
        .success();

    cli(temp_dir.path())
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 2 sessions"));
}

#[test]
fn test_partial_journal_line() {
    let (temp_dir, data_dir) = setup_test_dir();

    cli(temp_dir.path()).arg("seed").assert().success();
    cli(temp_dir.path())
        .args(["start", "Daily Mobility", "--auto-complete"])
        .assert()
        .success();

    // Simulate a crash halfway through an append
    let journal_path = data_dir.join("journal/sessions.jsonl");
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(&journal_path)
        .unwrap();
    write!(file, r#"{{"id":"partial"#).unwrap();
    drop(file);

    cli(temp_dir.path())
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 1 sessions"));
}

#[test]
fn test_empty_journal() {
    let (temp_dir, data_dir) = setup_test_dir();
    fs::write(data_dir.join("journal/sessions.jsonl"), "").unwrap();

    cli(temp_dir.path())
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 0 sessions"));

    assert!(!data_dir.join("sessions.csv").exists());
}

#[test]
fn test_invalid_config_fails() {
    let (temp_dir, _) = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[protocols]\ndelete_policy = \"shred_everything\"\n",
    )
    .unwrap();

    cli(temp_dir.path()).arg("protocols").assert().failure();
}

#[test]
fn test_invalid_custom_exercise_rejected() {
    let (temp_dir, _) = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        r#"
[[catalog.custom]]
id = "my_row"
name = ""
kind = "conditioning"
"#,
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("protocols")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Catalog validation errors"));
}
