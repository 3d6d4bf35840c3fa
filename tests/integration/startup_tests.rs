//! Startup tests running the compiled binary.
//!
//! The server must refuse to start, and must not bind, when the survey
//! document is missing or invalid.

use std::net::TcpListener;
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_survey-front");

/// A port that is free right now.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn run_serve(config: Option<&str>, port: u16) -> Output {
    let mut command = Command::new(BIN);
    command
        .args(["serve", "--host", "127.0.0.1", "--port", &port.to_string()])
        .env_remove("CONFIG")
        .env_remove("SURVEY_AUTH_MODE")
        .env_remove("RUST_LOG");
    if let Some(config) = config {
        command.env("CONFIG", config);
    }
    command.output().unwrap()
}

#[test]
fn test_missing_config_exits_nonzero() {
    let port = free_port();
    let output = run_serve(None, port);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Missing CONFIG environment variable"));
    assert!(!stdout.contains("Server listening"));

    // Nothing was left bound to the port
    assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
}

#[test]
fn test_missing_config_without_subcommand() {
    let output = Command::new(BIN)
        .args(["--port", &free_port().to_string()])
        .env_remove("CONFIG")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_invalid_yaml_exits_nonzero() {
    let output = run_serve(Some("title: [unclosed"), free_port());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Invalid YAML"));
}

#[test]
fn test_missing_required_key_exits_nonzero() {
    let output = run_serve(Some("title: Only a title"), free_port());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("questions"));
}

#[test]
fn test_token_mode_without_secret_exits_nonzero() {
    let output = Command::new(BIN)
        .args(["serve", "--auth-mode", "token", "--port", &free_port().to_string()])
        .env("CONFIG", "title: t\nquestions: []")
        .env_remove("SURVEY_AUTH_SECRET")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_check_command() {
    let output = Command::new(BIN)
        .arg("check")
        .env("CONFIG", "title: Pulse\nquestions: [a, b, c]")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Pulse"));
    assert!(stdout.contains("Questions: 3"));

    let output = Command::new(BIN)
        .arg("check")
        .env_remove("CONFIG")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_sign_command_prints_verifiable_token() {
    let output = Command::new(BIN)
        .args(["sign", "--secret", "k", "--user", "alice", "--group", "a,b"])
        .env_remove("SURVEY_AUTH_SECRET")
        .output()
        .unwrap();
    assert!(output.status.success());

    let token = String::from_utf8(output.stdout).unwrap();
    let identity = survey_front::SignedTokenAuth::new("k")
        .verify(token.trim())
        .unwrap();
    assert_eq!(identity.username, "alice");
    assert_eq!(identity.groups, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_sign_command_with_maximum_ttl() {
    let ttl = u64::MAX.to_string();
    let output = Command::new(BIN)
        .args(["sign", "--secret", "k", "--user", "alice", "--ttl", &ttl])
        .env_remove("SURVEY_AUTH_SECRET")
        .output()
        .unwrap();
    assert!(output.status.success());

    let token = String::from_utf8(output.stdout).unwrap();
    assert!(survey_front::SignedTokenAuth::new("k").verify(token.trim()).is_ok());
}
