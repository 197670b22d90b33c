//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::{ConfigFixture, TWO_WORKER_CONFIG};

/// Get a command for the consult-mesh binary
fn mesh_cmd() -> Command {
    let mut cmd = Command::cargo_bin("consult-mesh").unwrap();
    cmd.env_remove("CONSULT_MESH_CONFIG")
        .env_remove("CONSULT_MESH_BACKEND")
        .env_remove("RUST_LOG");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    mesh_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("workers"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    mesh_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("consult-mesh"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_submit_help() {
    mesh_cmd()
        .args(["submit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--worker"))
        .stdout(predicate::str::contains("--timeout-ms"));
}

// ─────────────────────────────────────────────────────────────────
// Submit Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_submit_runs_consultation_chain() {
    let fixture = ConfigFixture::with_content(TWO_WORKER_CONFIG);

    // "a" always consults "b"; the mock appends " (refined)" per generation
    mesh_cmd()
        .args(["-q", "submit", "--config", fixture.path(), "--worker", "a", "plan", "a", "picnic"])
        .assert()
        .success()
        .stdout("Refine: plan a picnic (refined) (refined)\n");
}

#[test]
fn test_submit_without_consultation() {
    let fixture = ConfigFixture::with_content(TWO_WORKER_CONFIG);

    mesh_cmd()
        .args(["-q", "submit", "-c", fixture.path(), "-w", "b", "soup"])
        .assert()
        .success()
        .stdout("soup (refined)\n");
}

#[test]
fn test_submit_json_report() {
    let fixture = ConfigFixture::with_content(TWO_WORKER_CONFIG);

    mesh_cmd()
        .args(["-q", "submit", "-c", fixture.path(), "-w", "a", "--json", "x"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"answer\": \"Refine: x (refined) (refined)\"",
        ))
        .stdout(predicate::str::contains("\"deliveries\": 2"))
        .stdout(predicate::str::contains("\"consultations\": 1"));
}

#[test]
fn test_submit_unknown_worker() {
    let fixture = ConfigFixture::with_content(TWO_WORKER_CONFIG);

    mesh_cmd()
        .args(["-q", "submit", "-c", fixture.path(), "-w", "ghost", "x"])
        .assert()
        .failure()
        .code(30)
        .stderr(predicate::str::contains("E301"))
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_submit_depth_limit() {
    let fixture = ConfigFixture::with_content(
        r#"
[generation]
backend = "mock"

[[workers]]
id = "ping"
persona = "Ping"
consultation_probability = 1.0

[[workers]]
id = "pong"
persona = "Pong"
consultation_probability = 1.0
"#,
    );

    mesh_cmd()
        .args(["-q", "submit", "-c", fixture.path(), "-w", "ping", "--max-depth", "2", "x"])
        .assert()
        .failure()
        .code(60)
        .stderr(predicate::str::contains("E602"));
}

#[test]
fn test_submit_cycle_ends_in_timeout() {
    let fixture = ConfigFixture::with_content(
        r#"
[mesh]
chain_timeout_ms = 300

[generation]
backend = "mock"

[[workers]]
id = "a"
persona = "A"
consultation_probability = 1.0
framing = "{draft}"

[[workers]]
id = "b"
persona = "B"
consultation_probability = 1.0
framing = "{draft}"
"#,
    );

    mesh_cmd()
        .args(["-q", "submit", "-c", fixture.path(), "-w", "a", "hello"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .code(60)
        .stderr(predicate::str::contains("E601"));
}

#[test]
fn test_submit_env_backend_override() {
    let fixture = ConfigFixture::with_content(
        r#"
[generation]
backend = "openai"
base_url = "http://127.0.0.1:9"

[[workers]]
id = "solo"
persona = "Solo"
consultation_probability = 0.0
"#,
    );

    mesh_cmd()
        .env("CONSULT_MESH_BACKEND", "mock")
        .args(["-q", "submit", "-c", fixture.path(), "-w", "solo", "x"])
        .assert()
        .success()
        .stdout("x (refined)\n");
}

// ─────────────────────────────────────────────────────────────────
// Workers Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_workers_lists_configured_roster() {
    let fixture = ConfigFixture::with_content(TWO_WORKER_CONFIG);

    mesh_cmd()
        .args(["workers", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("CONSULT P"))
        .stdout(predicate::str::contains("Alpha"))
        .stdout(predicate::str::contains("1.00"));
}

#[test]
fn test_workers_falls_back_to_bundled_fleet() {
    let fixture = ConfigFixture::with_content("[generation]\nbackend = \"mock\"\n");

    mesh_cmd()
        .args(["workers", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("chef"))
        .stdout(predicate::str::contains("engineer"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show() {
    let fixture = ConfigFixture::with_content(TWO_WORKER_CONFIG);

    mesh_cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("[mesh]"))
        .stdout(predicate::str::contains("[generation]"))
        .stdout(predicate::str::contains("[logging]"))
        .stdout(predicate::str::contains("[[workers]]"));
}

#[test]
fn test_config_validate() {
    let fixture = ConfigFixture::with_content(TWO_WORKER_CONFIG);

    mesh_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("2 workers"));
}

#[test]
fn test_config_validate_nonexistent_file() {
    mesh_cmd()
        .args(["config", "validate", "--config", "/nonexistent/path/config.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E100"));
}

#[test]
fn test_config_init_help() {
    mesh_cmd()
        .args(["config", "init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--path"))
        .stdout(predicate::str::contains("--force"));
}

// ─────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_command() {
    mesh_cmd()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_subcommand() {
    mesh_cmd().assert().failure();
}
