//! Integration tests for the `comicer` binary
//!
//! These run the built executable against a temporary config file and check
//! what ends up on stdout, stderr and in the exit status.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Writes a config with one source whose site refuses connections
fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let content = format!(
        r##"
save-path = "{root}/comic"
state-path = "{root}/state"

[driver]
navigation-delay-ms = 0
connect-timeout-secs = 1

[[source]]
name = "closed"
start-url = "http://127.0.0.1:1/favorites"
login-url = "http://127.0.0.1:1/login"
username = "reader"
password = "hunter2"
username-selector = "#user"
password-selector = "#pass"
login-submit-selector = "#submit"
favorite-url-selector = "a.fav"
download-url-selector = "a.dl"
title-selector = "h1"
"##,
        root = dir.display()
    );
    std::fs::write(&path, content).unwrap();
    path
}

fn comicer(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("comicer").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

/// `config` prints only TOML on stdout; logging goes to stderr
#[test]
fn test_config_prints_clean_toml() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let assert = comicer(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not())
        .stderr(predicate::str::contains("Loading configuration"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let parsed: toml::Value = toml::from_str(&stdout).expect("stdout is not TOML");
    assert_eq!(parsed["source"][0]["name"].as_str(), Some("closed"));
}

#[test]
fn test_source_list() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    comicer(&config)
        .args(["source", "list"])
        .assert()
        .success()
        .stdout("closed(http://127.0.0.1)\n");
}

/// `-a` runs every source; the unreachable one fails the run
#[test]
fn test_short_all_flag_runs_every_source() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    comicer(&config)
        .args(["source", "start", "-a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 source(s) failed: closed"));
}

#[test]
fn test_start_needs_sources_or_all() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    comicer(&config)
        .args(["source", "start"])
        .assert()
        .code(2);
}
