//! Concurrency tests for the coachcal binary.
//!
//! These tests verify that multiple processes sharing one data dir:
//! - Never create two open attempts for the same session and day
//! - Never lose each other's writes

use assert_cmd::Command;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

const ATHLETE: &str = "6f1c2b4e-8a7d-4c3b-9e21-0a5d6c7b8e90";
const PROGRAM: &str = "0b6e7c1a-2f3d-4e5a-8b9c-1d2e3f4a5b6c";
const SESSION: &str = "a1b2c3d4-0000-4000-8000-000000000001";

fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let catalog = serde_json::json!({
        "programs": [{ "id": PROGRAM, "name": "Base Strength", "coach_id": null }],
        "templates": [{
            "id": SESSION, "name": "Lower Body", "description": null,
            "day_of_week": 1, "week_number": 1, "estimated_duration_minutes": 45,
            "session_type": "strength", "program_id": PROGRAM
        }]
    });
    std::fs::write(temp_dir.path().join("catalog.json"), catalog.to_string()).unwrap();
    temp_dir
}

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("coachcal"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--athlete")
        .arg(ATHLETE)
        .arg("--json");
    cmd
}

fn stored_attempts(data_dir: &Path) -> Vec<Value> {
    let contents = std::fs::read_to_string(data_dir.join("store.json")).unwrap();
    let tables: Value = serde_json::from_str(&contents).unwrap();
    tables["attempts"].as_array().cloned().unwrap_or_default()
}

#[test]
fn test_concurrent_start_creates_one_attempt() {
    let temp_dir = setup_test_dir();
    let data_dir: PathBuf = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                let output = cli(&data_dir)
                    .arg("--now")
                    .arg(format!("2024-03-04T09:00:0{}Z", i))
                    .args(["start", "--session", SESSION])
                    .output()
                    .expect("Failed to run coachcal");
                assert!(output.status.success());
                let attempt: Value = serde_json::from_slice(&output.stdout).unwrap();
                attempt["id"].as_str().unwrap().to_string()
            })
        })
        .collect();

    let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1, "All starts should return the same attempt");
    assert_eq!(stored_attempts(&data_dir).len(), 1);
}

#[test]
fn test_concurrent_readiness_and_start_both_persist() {
    let temp_dir = setup_test_dir();
    let data_dir: PathBuf = temp_dir.path().to_path_buf();

    let starter = {
        let data_dir = data_dir.clone();
        thread::spawn(move || {
            cli(&data_dir)
                .args(["--now", "2024-03-04T09:00:00Z", "start", "--session", SESSION])
                .assert()
                .success();
        })
    };
    let checker = {
        let data_dir = data_dir.clone();
        thread::spawn(move || {
            cli(&data_dir)
                .args(["--now", "2024-03-04T07:00:00Z", "readiness"])
                .args(["--sleep", "7", "--energy", "7", "--soreness", "3", "--stress", "3"])
                .assert()
                .success();
        })
    };
    starter.join().unwrap();
    checker.join().unwrap();

    let contents = std::fs::read_to_string(data_dir.join("store.json")).unwrap();
    let tables: Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(tables["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(tables["readiness"].as_array().unwrap().len(), 1);
}
