//! CLI end-to-end tests
//!
//! Tests for the audioslicer command-line interface. None of these need
//! ffmpeg: every case either stops before the engine is loaded or only
//! reports tool availability.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the audioslicer binary
#[allow(deprecated)]
fn audioslicer_cmd() -> Command {
    Command::cargo_bin("audioslicer").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    audioslicer_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_lists_commands() {
    audioslicer_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("audioslicer"))
        .stdout(predicate::str::contains("split"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_cli_version_command() {
    audioslicer_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("audioslicer "));
}

#[test]
fn test_cli_check_tools_command() {
    audioslicer_cmd()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_validate_defaults() {
    audioslicer_cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("Default segment length: 15 min"));
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"server": {"port": 9000}, "split": {"default_minutes": 500}}"#,
    )
    .unwrap();

    audioslicer_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("127.0.0.1:9000"))
        .stdout(predicate::str::contains("split.default_minutes 500"));
}

#[test]
fn test_cli_validate_rejects_malformed_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    audioslicer_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn test_cli_split_missing_file() {
    audioslicer_cmd()
        .args(["split", "/nonexistent/podcast.mp3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_split_rejects_non_audio() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "hello").unwrap();

    audioslicer_cmd()
        .arg("split")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please select a valid audio file"));
}

#[test]
fn test_cli_split_rejects_out_of_range_minutes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("talk.mp3");
    fs::write(&path, "ID3").unwrap();

    audioslicer_cmd()
        .arg("split")
        .arg(&path)
        .args(["--minutes", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 120"));
}
