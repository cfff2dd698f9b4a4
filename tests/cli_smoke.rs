//! Behavioural smoke tests for the CLI entrypoint.

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

const NO_CONFIG_FIXTURE: &str = r#"{
    "parent": {"id": 1, "label": "web-1", "region": "us-east"},
    "configs": 0
}"#;

const DETACH_FIXTURE: &str = r#"{
    "parent": {"id": 1, "label": "web-1", "region": "us-east"},
    "volumes": [
        {"id": 7, "label": "data", "size": 20, "region": "us-east", "parent_id": 1}
    ],
    "intents": [
        {"intent": "open_confirmation", "mode": "detach", "target": 7},
        {"intent": "confirm_action"}
    ]
}"#;

fn write_fixture(tmp: &TempDir, contents: &str) -> PathBuf {
    let path = tmp.path().join("fixture.json");
    fs::write(&path, contents).unwrap_or_else(|err| panic!("write fixture: {err}"));
    path
}

#[test]
fn render_prints_the_no_config_placeholder() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let fixture = write_fixture(&tmp, NO_CONFIG_FIXTURE);

    let mut cmd = cargo_bin_cmd!("mooring");
    cmd.current_dir(tmp.path())
        .arg("render")
        .arg(&fixture)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"no-config\""))
        .stdout(predicate::str::contains("\"rows\": []"));
}

#[test]
fn apply_reports_steps_and_event_refreshes() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let fixture = write_fixture(&tmp, DETACH_FIXTURE);

    let mut cmd = cargo_bin_cmd!("mooring");
    cmd.current_dir(tmp.path())
        .arg("apply")
        .arg(&fixture)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"confirm_action\""))
        .stdout(predicate::str::contains("\"completed\""))
        .stdout(predicate::str::contains("\"refreshes_from_events\": 1"))
        .stdout(predicate::str::contains("\"attach\""));
}

#[test]
fn missing_fixture_fails_with_a_message() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));

    let mut cmd = cargo_bin_cmd!("mooring");
    cmd.current_dir(tmp.path())
        .arg("render")
        .arg(tmp.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("fixture error"));
}
