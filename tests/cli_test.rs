//! Integration tests for the CLI binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_config(defaults: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("defaults.yml"), defaults).unwrap();
    temp
}

fn preflight(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("preflight"));
    cmd.arg("--config-dir").arg(temp.path()).arg("--no-color");
    cmd
}

const ECHO_DEFAULTS: &str = r#"
groups:
  tooling:
    display_name: Required tooling
    category: environment
    strategies:
      - name: command
        priority: 10
    targets:
      - id: echo
        display_name: echo
        params:
          command: echo ok
"#;

const BROKEN_DEFAULTS: &str = r#"
groups:
  tooling:
    category: environment
    strategies:
      - name: command
        priority: 10
    targets:
      - id: missing
        params:
          command: definitely-not-a-real-binary-xyz
"#;

#[test]
fn shows_help() {
    Command::new(cargo_bin("preflight"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("environment diagnostics"));
}

#[test]
fn shows_version() {
    Command::new(cargo_bin("preflight"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn run_passes_with_working_tooling() {
    let temp = setup_config(ECHO_DEFAULTS);
    preflight(&temp)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Required tooling"))
        .stdout(predicate::str::contains("✓ ready"));
}

#[test]
fn no_subcommand_defaults_to_run() {
    let temp = setup_config(ECHO_DEFAULTS);
    preflight(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ ready"));
}

#[test]
fn run_fails_with_exit_code_one_on_broken_tooling() {
    let temp = setup_config(BROKEN_DEFAULTS);
    preflight(&temp)
        .arg("run")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("✗ not ready"));
}

#[test]
fn run_emits_json_when_requested() {
    let temp = setup_config(ECHO_DEFAULTS);
    let output = preflight(&temp)
        .args(["run", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["project"], "defaults");
    assert_eq!(report["groups"][0]["status"], "PASS");
    assert_eq!(report["summary"]["groups_passed"], 1);
}

#[test]
fn quiet_run_prints_one_line_per_project() {
    let temp = setup_config(ECHO_DEFAULTS);
    preflight(&temp)
        .args(["--quiet", "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defaults: ready"));
}

#[test]
fn unknown_profile_exits_with_code_two() {
    let temp = setup_config(ECHO_DEFAULTS);
    preflight(&temp)
        .args(["run", "--profile", "nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown profile"));
}

#[test]
fn unknown_project_exits_with_code_two() {
    let temp = setup_config(ECHO_DEFAULTS);
    preflight(&temp)
        .args(["run", "--projects", "ghost"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn malformed_defaults_reports_parse_error() {
    let temp = setup_config("groups: [not: a: map\n");
    preflight(&temp)
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("defaults.yml"));
}

#[test]
fn list_shows_projects_and_profiles() {
    let temp = setup_config(ECHO_DEFAULTS);
    let projects = temp.path().join("projects");
    fs::create_dir_all(&projects).unwrap();
    fs::write(projects.join("demo.yml"), "groups: {}\n").unwrap();
    fs::write(
        temp.path().join("profiles.yml"),
        "profiles:\n  offline:\n    description: skip network checks\n",
    )
    .unwrap();

    preflight(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("offline"))
        .stdout(predicate::str::contains("tooling"));
}

#[test]
fn list_json_is_machine_readable() {
    let temp = setup_config(ECHO_DEFAULTS);
    let output = preflight(&temp)
        .args(["list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let doc: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(doc["default_groups"][0], "tooling");
}
