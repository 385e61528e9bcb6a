//! CLI integration tests using assert_cmd.
//!
//! Offline subcommands read a request file (or stdin) and print the JSON
//! response, so every test here runs without a server.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[allow(deprecated)]
fn lottocover() -> Command {
    Command::cargo_bin("lottocover").unwrap()
}

fn request_file(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f
}

// --- Help and arg validation ---

#[test]
fn help_shows_all_subcommands() {
    lottocover().arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("greedy"))
            .and(predicate::str::contains("budget"))
            .and(predicate::str::contains("generate")),
    );
}

#[test]
fn help_serve_shows_args() {
    lottocover()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port").and(predicate::str::contains("--bind")));
}

#[test]
fn global_flags_listed() {
    lottocover()
        .args(["greedy", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--request")
                .and(predicate::str::contains("--config"))
                .and(predicate::str::contains("--threads")),
        );
}

#[test]
fn unknown_subcommand_fails() {
    lottocover().arg("draw").assert().failure();
}

#[test]
fn version_flag() {
    lottocover()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// --- Offline requests ---

#[test]
fn greedy_from_file_prints_system() {
    let req = request_file(r#"{"numbers": [1, 2, 3, 4, 5, 6], "mode": "classic"}"#);
    let output = lottocover()
        .args(["greedy", "--request"])
        .arg(req.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["system_size"], 4);
    assert_eq!(body["coverage"], 100.0);
}

#[test]
fn greedy_from_stdin() {
    lottocover()
        .args(["greedy", "--request", "-"])
        .write_stdin(r#"{"numbers": [1, 2, 3, 4, 5], "forced_numbers": [1, 2]}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"system\""));
}

#[test]
fn budget_money_mode() {
    let req = request_file(
        r#"{"numbers": [1,2,3,4,5,6,7,8,9,10,11,12], "mode": "money", "budget": 30, "ticket_cost": 10, "seed": 1}"#,
    );
    let output = lottocover()
        .args(["budget", "--request"])
        .arg(req.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["system_size"], 3);
    assert_eq!(body["spent"], 30.0);
}

#[test]
fn generate_with_empty_request() {
    lottocover()
        .args(["generate"])
        .write_stdin("{}")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 6"));
}

#[test]
fn insufficient_pool_exits_nonzero() {
    let req = request_file(r#"{"numbers": [1, 2, 3, 4]}"#);
    lottocover()
        .args(["greedy", "--request"])
        .arg(req.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient_pool"));
}

#[test]
fn invalid_json_exits_nonzero() {
    lottocover()
        .args(["greedy", "--request", "-"])
        .write_stdin("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn missing_request_file_exits_nonzero() {
    lottocover()
        .args(["generate", "--request", "/nonexistent/lottocover-request.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read request"));
}

#[test]
fn config_file_limits_apply() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("lottocover.toml");
    std::fs::write(&config, "[optimizer]\nmax_system_size = 2\n").unwrap();
    let req = request_file(r#"{"numbers": [1,2,3,4,5,6,7,8], "mode": "count", "ticket_count": 3}"#);
    lottocover()
        .arg("--config")
        .arg(&config)
        .args(["budget", "--request"])
        .arg(req.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_ticket_count"));
}

#[test]
fn missing_config_file_fails() {
    lottocover()
        .args(["--config", "/nonexistent/lottocover.toml", "generate"])
        .write_stdin("{}")
        .assert()
        .failure();
}
