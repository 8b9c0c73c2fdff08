// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rust specs for `obctl` help, version and argument parsing.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use yare::parameterized;

fn obctl() -> Command {
    cargo_bin_cmd!("obctl")
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    obctl()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_every_command() {
    let mut assert = obctl().arg("--help").assert().success();
    for command in [
        "identify", "track", "register", "disable", "token", "pair", "status", "flush",
    ] {
        assert = assert.stdout(predicate::str::contains(command));
    }
}

#[test]
fn help_shows_quickstart() {
    obctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Get started:"));
}

#[test]
fn version_flag_prints_version() {
    obctl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "obctl {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[parameterized(
    identify = { "identify" },
    track = { "track" },
    register = { "register" },
    disable = { "disable" },
    token = { "token" },
    pair = { "pair" },
    status = { "status" },
    flush = { "flush" },
)]
fn command_supports_help_flag(command: &str) {
    obctl()
        .args([command, "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn identify_rejects_blank_user_id() {
    obctl()
        .args(["identify", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be empty"));
}

#[test]
fn track_rejects_malformed_property() {
    obctl()
        .args(["track", "signup", "--prop", "plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

#[test]
fn pair_requires_pin() {
    obctl()
        .arg("pair")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<PIN>"));
}
