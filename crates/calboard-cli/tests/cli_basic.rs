//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary and verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command against `config` and return (stdout, stderr, code).
fn run_cli(config: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_calboard"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_config_path_echoes_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (stdout, _, code) = run_cli(&path, &["config", "path"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), path.display().to_string());
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calboard").join("config.toml");

    let (_, _, code) = run_cli(&path, &["config", "init"]);
    assert_eq!(code, 0, "config init failed");
    assert!(path.exists());

    let (stdout, _, code) = run_cli(&path, &["config", "show", "calendar.window_days"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "30");

    let (stdout, _, code) = run_cli(&path, &["config", "show"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["sync"]["interval_secs"], 1200);
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    assert_eq!(run_cli(&path, &["config", "init"]).2, 0);

    let (_, stderr, code) = run_cli(&path, &["config", "init"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already exists"));
    assert_eq!(run_cli(&path, &["config", "init", "--force"]).2, 0);
}

#[test]
fn test_once_without_credentials_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli(&path, &["once"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "unexpected stderr: {stderr}");
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(&dir.path().join("config.toml"), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("calboard"));
}
