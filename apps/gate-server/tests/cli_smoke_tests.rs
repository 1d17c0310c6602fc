#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the gate-server binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run_gate_server(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gate-server"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute gate-server")
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_cli_help_command() {
    let output = run_gate_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("run"), "Should contain 'run' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"));
}

#[test]
fn test_print_config_applies_overrides() {
    let file = config_file("gate_access:\n  min_confidence: 0.8\n");
    let path = file.path().to_str().unwrap();

    let output = run_gate_server(&["--config", path, "--port", "9311", "--print-config"]);

    assert!(output.status.success());
    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["server"]["port"], 9311);
    assert_eq!(printed["gate_access"]["min_confidence"], 0.8);
}

#[test]
fn test_check_accepts_valid_config() {
    let file = config_file("server:\n  port: 9312\ngate_access:\n  sweep_interval: 0s\n");
    let path = file.path().to_str().unwrap();

    let output = run_gate_server(&["--config", path, "check"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration is valid"));
}

#[test]
fn test_invalid_config_fails() {
    let file = config_file("gate_access:\n  min_confidence: 3.0\n");
    let path = file.path().to_str().unwrap();

    let output = run_gate_server(&["--config", path, "check"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("min_confidence"));
}

#[test]
fn test_missing_config_file_fails() {
    let output = run_gate_server(&["--config", "/nonexistent/gate.yaml", "check"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}
