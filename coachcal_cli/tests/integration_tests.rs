//! Integration tests for the coachcal binary.
//!
//! These tests verify end-to-end behavior including:
//! - The start / pause / resume / complete workflow
//! - Calendar projections with completion markers
//! - Readiness, progress and the daily message
//! - CSV export

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ATHLETE: &str = "6f1c2b4e-8a7d-4c3b-9e21-0a5d6c7b8e90";
const PROGRAM: &str = "0b6e7c1a-2f3d-4e5a-8b9c-1d2e3f4a5b6c";
const LOWER_BODY: &str = "a1b2c3d4-0000-4000-8000-000000000001";
const UPPER_BODY: &str = "a1b2c3d4-0000-4000-8000-000000000003";
const SQUAT: &str = "e0e0e0e0-0000-4000-8000-00000000000a";

// 2024-03-04 is a Monday
const MONDAY_0900: &str = "2024-03-04T09:00:00Z";

fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_catalog(temp_dir.path(), serde_json::json!([]));
    temp_dir
}

fn write_catalog(data_dir: &Path, coach_messages: Value) {
    let catalog = serde_json::json!({
        "programs": [{ "id": PROGRAM, "name": "Base Strength", "coach_id": null }],
        "templates": [
            {
                "id": LOWER_BODY, "name": "Lower Body", "description": null,
                "day_of_week": 1, "week_number": 1, "estimated_duration_minutes": 45,
                "session_type": "strength", "program_id": PROGRAM
            },
            {
                "id": UPPER_BODY, "name": "Upper Body", "description": null,
                "day_of_week": 3, "week_number": 1, "estimated_duration_minutes": 40,
                "session_type": "strength", "program_id": PROGRAM
            }
        ],
        "exercises": [{ "id": SQUAT, "name": "Back Squat" }],
        "coach_messages": coach_messages
    });
    fs::write(
        data_dir.join("catalog.json"),
        serde_json::to_string_pretty(&catalog).unwrap(),
    )
    .unwrap();
}

/// CLI bound to a data dir, an isolated config dir and the test athlete
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("coachcal"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--athlete")
        .arg(ATHLETE);
    cmd
}

fn run_json(data_dir: &Path, now: &str, args: &[&str]) -> Value {
    let output = cli(data_dir)
        .arg("--json")
        .arg("--now")
        .arg(now)
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn complete_lower_body(data_dir: &Path) {
    run_json(data_dir, MONDAY_0900, &["start", "--session", LOWER_BODY]);
    run_json(
        data_dir,
        "2024-03-04T09:45:00Z",
        &["complete", "--session", LOWER_BODY, "--rpe", "7"],
    );
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("coachcal"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Training calendar and session tracker"));
}

#[test]
fn test_start_creates_store() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let attempt = run_json(data_dir, MONDAY_0900, &["start", "--session", LOWER_BODY]);
    assert_eq!(attempt["session_id"], LOWER_BODY);
    assert_eq!(attempt["athlete_id"], ATHLETE);
    assert!(attempt["completed_at"].is_null());

    assert!(data_dir.join("store.json").exists());
}

#[test]
fn test_start_twice_same_day_reuses_attempt() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let first = run_json(data_dir, MONDAY_0900, &["start", "--session", LOWER_BODY]);
    let second = run_json(data_dir, "2024-03-04T09:05:00Z", &["start", "--session", LOWER_BODY]);
    assert_eq!(first["id"], second["id"]);
}

#[test]
fn test_full_lifecycle_excludes_paused_time() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run_json(data_dir, MONDAY_0900, &["start", "--session", LOWER_BODY]);
    let paused = run_json(data_dir, "2024-03-04T09:10:00Z", &["pause", "--session", LOWER_BODY]);
    assert!(!paused["paused_at"].is_null());

    let resumed = run_json(data_dir, "2024-03-04T09:15:00Z", &["resume", "--session", LOWER_BODY]);
    assert!(resumed["paused_at"].is_null());
    assert_eq!(resumed["total_paused_seconds"], 300);

    let done = run_json(
        data_dir,
        "2024-03-04T09:45:00Z",
        &["complete", "--session", LOWER_BODY, "--rpe", "8", "--notes", "solid"],
    );
    assert_eq!(done["duration_minutes"], 40);
    assert_eq!(done["active_seconds"], 2400);
    assert_eq!(done["overall_rpe"], 8);
    assert_eq!(done["notes"], "solid");
}

#[test]
fn test_workout_past_midnight_completes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let started = run_json(data_dir, "2024-03-04T23:40:00Z", &["start", "--session", LOWER_BODY]);
    let done = run_json(
        data_dir,
        "2024-03-05T00:30:00Z",
        &["complete", "--session", LOWER_BODY],
    );
    assert_eq!(done["id"], started["id"]);
    assert_eq!(done["duration_minutes"], 50);
}

#[test]
fn test_elapsed_human_output() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run_json(data_dir, MONDAY_0900, &["start", "--session", LOWER_BODY]);

    cli(data_dir)
        .arg("--now")
        .arg("2024-03-04T09:01:05Z")
        .args(["elapsed", "--session", LOWER_BODY])
        .assert()
        .success()
        .stdout(predicate::str::contains("0:01:05"));
}

#[test]
fn test_complete_without_start_is_rejected() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .arg("--now")
        .arg(MONDAY_0900)
        .args(["complete", "--session", LOWER_BODY])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not started today"));
}

#[test]
fn test_complete_twice_is_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    complete_lower_body(data_dir);

    cli(data_dir)
        .arg("--now")
        .arg("2024-03-04T10:00:00Z")
        .args(["complete", "--session", LOWER_BODY])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already completed"));
}

#[test]
fn test_start_unknown_session() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["start", "--session", "ffffffff-0000-4000-8000-000000000000"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_athlete_is_required() {
    let temp_dir = setup_test_dir();

    Command::new(assert_cmd::cargo::cargo_bin!("coachcal"))
        .env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["start", "--session", LOWER_BODY])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--athlete is required"));
}

#[test]
fn test_log_set_and_validation() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let attempt = run_json(data_dir, MONDAY_0900, &["start", "--session", LOWER_BODY]);
    let attempt_id = attempt["id"].as_str().unwrap();

    let log = run_json(
        data_dir,
        "2024-03-04T09:10:00Z",
        &["log-set", "--attempt", attempt_id, "--exercise", SQUAT, "--set", "1", "--weight", "100", "--reps", "5"],
    );
    assert_eq!(log["set_number"], 1);
    assert_eq!(log["weight_kg"], 100.0);

    cli(data_dir)
        .args(["log-set", "--attempt", attempt_id, "--exercise", SQUAT, "--set", "2", "--rpe", "11"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn test_week_view_marks_completion() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    complete_lower_body(data_dir);

    let model = run_json(
        data_dir,
        "2024-03-06T12:00:00Z",
        &["calendar", "--view", "week", "--date", "2024-03-04"],
    );
    assert_eq!(model["view"], "week");

    let days = model["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["day"]["date"], "2024-03-04");
    assert_eq!(days[6]["day"]["date"], "2024-03-10");

    let monday = days[0]["sessions"].as_array().unwrap();
    assert_eq!(monday.len(), 1);
    assert_eq!(monday[0]["template"]["name"], "Lower Body");
    assert_eq!(monday[0]["completed"], true);

    let wednesday = &days[2];
    assert_eq!(wednesday["day"]["is_today"], true);
    assert_eq!(wednesday["sessions"][0]["template"]["name"], "Upper Body");
    assert_eq!(wednesday["sessions"][0]["completed"], false);

    assert!(days[1]["sessions"].as_array().unwrap().is_empty());
}

#[test]
fn test_month_view_has_full_grid() {
    let temp_dir = setup_test_dir();

    let model = run_json(
        temp_dir.path(),
        MONDAY_0900,
        &["calendar", "--view", "month", "--date", "2024-03-15"],
    );
    let cells = model["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 42);
    // March 2024 starts on a Friday; the grid starts on Monday Feb 26
    assert_eq!(cells[0]["day"]["date"], "2024-02-26");
    assert_eq!(cells[0]["day"]["is_current_month"], false);
}

#[test]
fn test_year_view_counts_completions() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    complete_lower_body(data_dir);

    let model = run_json(data_dir, MONDAY_0900, &["calendar", "--view", "year"]);
    assert_eq!(model["year"], 2024);
    assert_eq!(model["months"][2], 1);
    assert_eq!(model["months"][0], 0);
}

#[test]
fn test_unknown_view_rejected() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["calendar", "--view", "fortnight"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown calendar view"));
}

#[test]
fn test_readiness_submit_and_resubmit() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let first = run_json(
        data_dir,
        MONDAY_0900,
        &["readiness", "--sleep", "8", "--energy", "7", "--soreness", "3", "--stress", "4"],
    );
    assert_eq!(first["overall_score"], 7.5);
    assert_eq!(first["log_date"], "2024-03-04");

    let second = run_json(
        data_dir,
        "2024-03-04T20:00:00Z",
        &["readiness", "--sleep", "10", "--energy", "10", "--soreness", "1", "--stress", "1"],
    );
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["overall_score"], 10.0);
}

#[test]
fn test_readiness_out_of_range() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["readiness", "--sleep", "0", "--energy", "5", "--soreness", "5", "--stress", "5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("sleep quality must be between 1 and 10"));
}

#[test]
fn test_data_based_readiness_without_history() {
    let temp_dir = setup_test_dir();

    let result = run_json(temp_dir.path(), MONDAY_0900, &["readiness"]);
    assert_eq!(result["score"], 8.5);
    assert_eq!(result["trend"], "stable");
}

#[test]
fn test_progress_after_completion() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    complete_lower_body(data_dir);

    let report = run_json(data_dir, "2024-03-04T18:00:00Z", &["progress"]);
    assert_eq!(report["streak"], 1);
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(report["summary"]["this_week"], 1);
    assert_eq!(report["weekly"].as_array().unwrap().len(), 8);
    assert_eq!(report["monthly"].as_array().unwrap().len(), 6);
}

#[test]
fn test_today_shows_quote_by_default() {
    let temp_dir = setup_test_dir();

    let today = run_json(temp_dir.path(), MONDAY_0900, &["today"]);
    assert_eq!(today["calendar"]["view"], "day");
    assert_eq!(today["calendar"]["schedule"]["sessions"][0]["template"]["name"], "Lower Body");
    assert_eq!(today["message"]["kind"], "quote");
}

#[test]
fn test_today_prefers_coach_message() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    write_catalog(
        data_dir,
        serde_json::json!([{
            "id": "c0c0c0c0-0000-4000-8000-000000000001",
            "coach_id": "c0c0c0c0-0000-4000-8000-0000000000cc",
            "athlete_id": ATHLETE,
            "body": "Deload this week",
            "display_date": "2024-03-01",
            "expires_on": null,
            "read_at": null,
            "created_at": "2024-03-01T08:00:00Z"
        }]),
    );

    let today = run_json(data_dir, MONDAY_0900, &["today"]);
    assert_eq!(today["message"]["kind"], "coach");
    assert_eq!(today["message"]["message"]["body"], "Deload this week");
}

#[test]
fn test_export_writes_csv_once() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    complete_lower_body(data_dir);

    let first = run_json(data_dir, "2024-03-04T18:00:00Z", &["export"]);
    assert_eq!(first["exported"], 1);

    let second = run_json(data_dir, "2024-03-04T18:00:00Z", &["export"]);
    assert_eq!(second["exported"], 0);

    let csv = fs::read_to_string(data_dir.join("attempts.csv")).unwrap();
    assert_eq!(csv.lines().count(), 2, "header plus one row");
    assert!(csv.contains(LOWER_BODY));
}
