//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME, so the
//! config file and the calibration flag never leak between tests.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command with `home` as HOME and return (stdout, stderr, code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_hints-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("HINTS_ENV")
        .env("HINTS_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn write_fast_config(home: &Path) {
    let dir = home.join(".config").join("hints-exam");
    std::fs::create_dir_all(&dir).unwrap();
    let config = "\
[timing]
tick_rate_hz = 10.0
save_delay_secs = 0.5
notification_extra_delay_secs = 0.2

[phases]
intro_secs = 0.0
free_gaze_secs = 0.3
hold_still_secs = 0.0
fixate_near_secs = 0.0
look_left_secs = 0.0
look_right_secs = 0.0
look_up_secs = 0.0
look_down_secs = 0.0

[audio.clips]
say_name = 0.1
intro = 0.1
free_gaze = 0.1
hold_still = 0.1
fixate_near = 0.1
look_left = 0.1
look_right = 0.1
look_up = 0.1
look_down = 0.1
notification = 0.1
";
    std::fs::write(dir.join("config.toml"), config).unwrap();
}

#[test]
fn test_config_get_default() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "timing.save_delay_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "120.0");
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "readiness.mode", "editor-simulation"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "readiness.mode"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "editor-simulation");
}

#[test]
fn test_config_rejects_invalid_value() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "timing.save_delay_secs", "-1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "timing.save_delay_secs"]);
    assert_eq!(stdout.trim(), "120.0");
}

#[test]
fn test_config_unknown_key() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "timing.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_is_json() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["storage"]["file_suffix"], "_longmessage");
}

#[test]
fn test_phases_json() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["phases"]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let phases = json["phases"].as_array().unwrap();
    assert_eq!(phases.len(), 11);
    assert_eq!(phases[0]["id"], "readiness_gate");
    assert_eq!(phases[10]["id"], "finalize");
    // free gaze: 60s base plus the 6s clip
    assert_eq!(phases[2]["effective_duration_secs"], 66.0);
    // intro 14 + free gaze 66 + hold still 13 + fixate near 19 + four looks at 18
    assert_eq!(json["timed_total_secs"], 184.0);
}

#[test]
fn test_calibration_launch_toggles() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["calibration", "status"]);
    assert_eq!(code, 0);
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["calibrated"], false);

    let (stdout, _, _) = run_cli(home.path(), &["calibration", "launch"]);
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["calibrated"], true);

    let (stdout, _, _) = run_cli(home.path(), &["calibration", "clear"]);
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["calibrated"], false);
}

#[test]
fn test_run_requires_calibration() {
    let home = TempDir::new().unwrap();
    write_fast_config(home.path());
    let (_, stderr, code) = run_cli(home.path(), &["run", "--max-seconds", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("calibration has not been performed"));
}

#[test]
fn test_run_refuses_unreachable_readiness() {
    let home = TempDir::new().unwrap();
    write_fast_config(home.path());
    let (_, _, code) = run_cli(home.path(), &["config", "set", "readiness.mode", "editor-simulation"]);
    assert_eq!(code, 0);

    let out = home.path().join("out");
    let out_arg = out.to_string_lossy().to_string();
    let (_, stderr, code) = run_cli(home.path(), &["run", "--calibrated", "--output-dir", &out_arg]);
    assert_eq!(code, 1);
    assert!(stderr.contains("readiness is never reached"));
    assert!(!out.exists());

    let (_, _, code) = run_cli(
        home.path(),
        &["run", "--calibrated", "--max-seconds", "1", "--output-dir", &out_arg],
    );
    assert_eq!(code, 0);
}

#[test]
fn test_run_saves_session_log() {
    let home = TempDir::new().unwrap();
    write_fast_config(home.path());
    let out = home.path().join("out");
    let out_arg = out.to_string_lossy().to_string();

    let (stdout, stderr, code) = run_cli(
        home.path(),
        &["run", "--calibrated", "--seed", "7", "--events", "--output-dir", &out_arg],
    );
    assert_eq!(code, 0, "run failed: {stderr}");

    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines[0]["type"], "ExaminationStarted");
    assert!(lines.iter().any(|l| l["type"] == "SaveArmed"));

    let summary = lines.last().unwrap();
    assert_eq!(summary["phase"], "finalize");
    let saved_to = summary["saved_to"].as_str().unwrap();
    assert!(saved_to.starts_with(&out_arg));
    assert!(saved_to.ends_with("_longmessage.txt"));

    let text = std::fs::read_to_string(saved_to).unwrap();
    assert!(text.starts_with("timestamp, worldLeftEyePosition"));
    assert!(text.contains("Start recording name: "));
    assert!(text.contains("Save is executed at: "));

    // starting consumed the calibration
    let (stdout, _, _) = run_cli(home.path(), &["calibration", "status"]);
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["calibrated"], false);
}
