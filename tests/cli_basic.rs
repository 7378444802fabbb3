//! Integration tests for basic CLI behavior.
//!
//! Only paths that exit before the server binds are exercised here.

#![allow(deprecated)] // cargo_bin deprecation: replacement not yet stable

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn anigate() -> Command {
    Command::cargo_bin("anigate").expect("binary 'anigate' should be built")
}

#[test]
fn help_flag_shows_usage() {
    anigate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: anigate"))
        .stdout(predicate::str::contains("[PORT]"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn version_flag_shows_semver() {
    anigate()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^anigate \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn non_numeric_port_is_rejected() {
    anigate()
        .arg("five")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn port_out_of_range_is_rejected() {
    anigate().arg("70000").assert().failure().code(2);
}

#[test]
fn missing_config_file_fails_before_binding() {
    anigate()
        .args(["--config", "/nonexistent/anigate/config.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn malformed_config_file_fails_before_binding() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number\"").unwrap();

    anigate()
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid TOML"));
}
