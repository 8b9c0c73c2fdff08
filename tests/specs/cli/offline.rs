// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rust specs for `obctl` when the API cannot be reached.
//!
//! Without a reachable server and without a cached config the pipeline
//! starts disabled: actions are accepted but nothing is queued or sent.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn obctl() -> Command {
    cargo_bin_cmd!("obctl")
}

/// A loopback URL nothing listens on.
fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn write_settings(temp: &TempDir, base_url: &str) -> PathBuf {
    let path = temp.path().join("config.toml");
    fs::write(
        &path,
        format!(
            "base_url = \"{base_url}\"\n\
             api_key = \"key\"\n\
             client_id = \"client\"\n\
             data_dir = \"data\"\n\
             timeout_secs = 1\n"
        ),
    )
    .unwrap();
    path
}

fn offline() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let config = write_settings(&temp, &closed_url());
    (temp, config)
}

#[test]
fn token_is_empty_line() {
    let (_temp, config) = offline();
    obctl()
        .arg("--config")
        .arg(&config)
        .arg("token")
        .assert()
        .success()
        .stdout("\n");
}

#[test]
fn status_reports_disabled_pipeline() {
    let (temp, config) = offline();
    obctl()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled: false"))
        .stdout(predicate::str::contains("user: -"))
        .stdout(predicate::str::contains("pending: 0"));

    assert!(temp.path().join("data").join("queue.db").exists());
}

#[test]
fn register_without_identity_fails() {
    let (_temp, config) = offline();
    obctl()
        .arg("--config")
        .arg(&config)
        .arg("register")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no identity"));
}

#[test]
fn identify_is_kept_locally_while_disabled() {
    let (_temp, config) = offline();
    obctl()
        .arg("--config")
        .arg(&config)
        .args(["identify", "user-1"])
        .assert()
        .success()
        .stdout("delivery disabled by remote config\n");

    obctl()
        .arg("--config")
        .arg(&config)
        .arg("register")
        .assert()
        .success()
        .stdout("delivery disabled by remote config\n");

    obctl()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("user: user-1"))
        .stdout(predicate::str::contains("pending: 0"));
}

#[test]
fn pair_is_refused_while_disabled() {
    let (_temp, config) = offline();
    obctl()
        .arg("--config")
        .arg(&config)
        .args(["pair", "1234"])
        .assert()
        .success()
        .stdout("not paired\n");
}

#[test]
fn missing_settings_file_fails() {
    let temp = TempDir::new().unwrap();
    obctl()
        .arg("--config")
        .arg(temp.path().join("missing.toml"))
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("settings file not found"));
}

#[test]
fn invalid_base_url_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_settings(&temp, "ftp://example.com");
    obctl()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid settings"))
        .stderr(predicate::str::contains("base_url"));
}
