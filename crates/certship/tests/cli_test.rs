//! Integration tests for the `certship` binary.
//!
//! Everything here fails before a Kubernetes client is built, so no
//! cluster (and no device) is required.
#![allow(clippy::unwrap_used)]

use std::io::Write as _;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn certship_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("certship");
    cmd.env_remove("CERTSHIP_CONFIG")
        .env_remove("CERTSHIP_NAMESPACE")
        .env_remove("CERTSHIP_ISSUER")
        .env_remove("CERTSHIP_DOMAIN_SUFFIX")
        .env_remove("CERTSHIP_TIMEOUT")
        .env_remove("CERTSHIP_VERIFY_TLS")
        .env_remove("CERTSHIP_CA_CERT");
    cmd
}

#[test]
fn test_no_args_is_a_usage_error() {
    certship_cmd()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--config"));
}

#[test]
fn test_help_flag() {
    certship_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("--config")
            .and(predicate::str::contains("--namespace"))
            .and(predicate::str::contains("--skip-resources"))
            .and(predicate::str::contains("--issuer-kind"))
            .and(predicate::str::contains("--domain-suffix"))
            .and(predicate::str::contains("--verify-tls"))
            .and(predicate::str::contains("--ca-cert")),
    );
}

#[test]
fn test_version_flag() {
    certship_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("certship"));
}

#[test]
fn test_missing_inventory_file() {
    certship_cmd()
        .args(["--config", "/nonexistent/devices.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("device inventory"));
}

#[test]
fn test_malformed_inventory_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ definitely not json").unwrap();

    certship_cmd()
        .arg("--config")
        .arg(file.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("device inventory"));
}

#[test]
fn test_invalid_issuer_kind_is_rejected() {
    certship_cmd()
        .args([
            "--config",
            "/tmp/devices.json",
            "--issuer-kind",
            "Banana",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("issuer-kind"));
}
