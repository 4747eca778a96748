// file: tests/cli_smoke.rs
// version: 1.0.0
// guid: 9a3c7e25-4b18-4d60-8f92-c5e1b7d40a83

//! Black-box smoke tests of the compiled binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const GOOD_CONFIG: &str = r#"
apiVersion: v1
metadata:
  name: smoke
baseDomain: example.com
platform:
  none: {}
pullSecret: '{"auths":{"quay.io":{"auth":"dXNlcjpwYXNz"}}}'
"#;

fn agent() -> Command {
    Command::cargo_bin("cluster-install-agent").unwrap()
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_help_lists_subcommands() {
    agent()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("wait-etcd"));
}

#[test]
fn test_version() {
    agent()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_validate_good_config() {
    let config = config_file(GOOD_CONFIG);

    agent()
        .args(["validate", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("smoke.example.com"))
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_validate_bad_config() {
    let config = config_file(&GOOD_CONFIG.replace("name: smoke", "name: Not_Valid"));

    agent()
        .args(["--quiet", "validate", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("metadata.name"));
}

#[test]
fn test_validate_missing_file() {
    agent()
        .args(["validate", "--config", "/nonexistent/install-config.yaml"])
        .assert()
        .failure();
}

#[test]
fn test_defaults_prints_defaulted_networks() {
    let config = config_file(GOOD_CONFIG);

    agent()
        .args(["--quiet", "defaults", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("10.0.0.0/16"))
        .stdout(predicate::str::contains("10.128.0.0/14"))
        .stdout(predicate::str::contains("172.30.0.0/16"))
        .stdout(predicate::str::contains("OVNKubernetes"));
}

#[test]
fn test_exec_echo() {
    agent()
        .args(["--quiet", "exec", "--", "echo", "hello from exec"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello from exec"));
}

#[test]
fn test_exec_failure_exit_code() {
    agent()
        .args(["--quiet", "exec", "--", "sh", "-c", "exit 4"])
        .assert()
        .failure();
}

#[test]
fn test_exec_chroot_missing_directory() {
    agent()
        .args(["--quiet", "exec", "--chroot", "/nonexistent", "--", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
