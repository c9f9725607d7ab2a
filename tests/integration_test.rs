//! Integration tests for stockchart CLI commands

use std::process::Command;

fn stockchart() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stockchart"))
}

/// Test that the help command works
#[test]
fn test_help_command() {
    let output = stockchart()
        .arg("--help")
        .output()
        .expect("Failed to execute help command");

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: stockchart"), "Should show usage");
    assert!(stdout.contains("watch"), "Should show watch command");
    assert!(stdout.contains("snapshot"), "Should show snapshot command");
    assert!(stdout.contains("config"), "Should show config command");
}

/// Test that the version command works
#[test]
fn test_version_command() {
    let output = stockchart()
        .arg("--version")
        .output()
        .expect("Failed to execute version command");

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

/// Test that config reset writes a file config show can read back
#[test]
fn test_config_reset_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let output = stockchart()
        .args(["--config-file", path.to_str().unwrap(), "config", "reset"])
        .output()
        .expect("Failed to execute config reset");
    assert!(output.status.success(), "Config reset should succeed");
    assert!(path.exists(), "Config file should be written");

    let output = stockchart()
        .args(["--config-file", path.to_str().unwrap(), "config", "show"])
        .output()
        .expect("Failed to execute config show");
    assert!(output.status.success(), "Config show should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("005930"), "Should list the default symbol");
    assert!(stdout.contains("rest_url"), "Should show backend settings");
}

/// Test that an invalid timeframe is rejected by argument parsing
#[test]
fn test_invalid_timeframe_rejected() {
    let output = stockchart()
        .args(["snapshot", "--symbol", "005930", "--timeframe", "fortnight"])
        .output()
        .expect("Failed to execute snapshot command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown timeframe"));
}
