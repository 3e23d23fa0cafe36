//! Smoke tests -- verify the binary runs and key subcommands load.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("pagepulse")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Synthetic browser monitoring"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("pagepulse")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("pagepulse"));
}

#[test]
fn test_serve_subcommand_exists() {
    Command::cargo_bin("pagepulse")
        .unwrap()
        .args(["serve", "--help"])
        .assert()
        .success();
}

#[test]
fn test_probe_subcommand_exists() {
    Command::cargo_bin("pagepulse")
        .unwrap()
        .args(["probe", "--help"])
        .assert()
        .success();
}

#[test]
fn test_check_reports_plan_steps() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("plan.yaml");
    std::fs::write(
        &path,
        r#"
name: smoke
defaultType: browser
steps:
  - name: go
    action: visit
    options:
      url: https://example.com
"#,
    )
    .unwrap();

    Command::cargo_bin("pagepulse")
        .unwrap()
        .args(["check", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicates::str::contains("Plan 'smoke': 1 step(s)"))
        .stdout(predicates::str::contains("No warnings."));
}

#[test]
fn test_check_fails_on_invalid_plan() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("plan.yaml");
    std::fs::write(
        &path,
        r#"
name: broken
steps:
  - name: go
    action: vist
"#,
    )
    .unwrap();

    Command::cargo_bin("pagepulse")
        .unwrap()
        .args(["check", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicates::str::contains("unknown action 'vist'"));
}

#[test]
fn test_missing_config_file_errors() {
    Command::cargo_bin("pagepulse")
        .unwrap()
        .args(["check", "--config", "/nonexistent/plan.yaml"])
        .assert()
        .failure();
}
