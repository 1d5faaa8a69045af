//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("submit"), "Should show submit command");
    assert!(stdout.contains("list"), "Should show list command");
    assert!(stdout.contains("describe"), "Should show describe command");
    assert!(stdout.contains("delete"), "Should show delete command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("gwm"), "Should show binary name");
}

/// Test submit subcommand help
#[test]
fn test_submit_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "submit", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Submit help should succeed");
    assert!(stdout.contains("--file"), "Should show file option");
    assert!(stdout.contains("--image"), "Should show image option");
    assert!(stdout.contains("--gpu"), "Should show gpu option");
    assert!(stdout.contains("--pool"), "Should show pool option");
    assert!(stdout.contains("--priority"), "Should show priority option");
}

/// Test list subcommand help
#[test]
fn test_list_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "list", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "List help should succeed");
    assert!(
        stdout.contains("--all-namespaces"),
        "Should show all-namespaces option"
    );
}

/// Test describe subcommand help
#[test]
fn test_describe_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "describe", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Describe help should succeed");
    assert!(
        stdout.contains("IDENTIFIER"),
        "Should show identifier argument"
    );
}

/// Test delete subcommand help
#[test]
fn test_delete_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "delete", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Delete help should succeed");
    assert!(stdout.contains("--force"), "Should show force option");
}

/// Test global namespace and format options
#[test]
fn test_global_options() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        stdout.contains("--namespace"),
        "Should show namespace option"
    );
    assert!(stdout.contains("GWM_NAMESPACE"), "Should show env var");
    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "invalid-command"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = Command::new("cargo")
        .args(["run", "-p", "gwm-cli", "--", "describe"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}
