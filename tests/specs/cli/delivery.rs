// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rust specs for `obctl` against a live HTTP endpoint.
//!
//! A mockito server stands in for the API; each spec states the requests it
//! expects and how often.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use mockito::{Matcher, Mock, Server, ServerGuard};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn obctl() -> Command {
    cargo_bin_cmd!("obctl")
}

// =============================================================================
// Helpers
// =============================================================================

fn project(server: &ServerGuard, extra: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(
        &path,
        format!(
            "base_url = \"{}\"\n\
             api_key = \"key\"\n\
             client_id = \"client\"\n\
             data_dir = \"data\"\n\
             push_token = \"push-abc\"\n\
             timeout_secs = 2\n\
             {extra}",
            server.url()
        ),
    )
    .unwrap();
    (temp, path)
}

/// `GET /config` answering `enabled`, fetched once per invocation.
fn config(server: &mut ServerGuard, enabled: bool, invocations: usize) -> Mock {
    server
        .mock("GET", "/config")
        .match_query(Matcher::Any)
        .match_header("x-api-key", "key")
        .match_header("x-client-id", "client")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "enabled": enabled }).to_string())
        .expect(invocations)
        .create()
}

fn post(server: &mut ServerGuard, path: &str, body: serde_json::Value, status: usize) -> Mock {
    server
        .mock("POST", path)
        .match_header("x-api-key", "key")
        .match_body(Matcher::PartialJson(body))
        .with_status(status)
}

fn run(config: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    obctl().arg("--config").arg(config).args(args).assert()
}

// =============================================================================
// Specs
// =============================================================================

#[test]
fn identify_then_track_are_delivered_once_each() {
    let mut server = Server::new();
    let config = config(&mut server, true, 2);
    let identify = post(
        &mut server,
        "/identify",
        json!({ "userId": "user-1", "email": "ada@example.com" }),
        200,
    )
    .expect(1)
    .create();
    let track = post(
        &mut server,
        "/track",
        json!({
            "userId": "user-1",
            "event": { "name": "signup", "properties": { "plan": "pro" } }
        }),
        200,
    )
    .expect(1)
    .create();
    let (_temp, path) = project(&server, "");

    run(&path, &["identify", "user-1", "--email", "ada@example.com"])
        .success()
        .stdout("delivered 1, dropped 0, queued 0\n");
    identify.assert();

    run(&path, &["track", "signup", "--prop", "plan=pro"])
        .success()
        .stdout("delivered 1, dropped 0, queued 0\n");
    track.assert();
    config.assert();
}

#[test]
fn status_shows_identified_user() {
    let mut server = Server::new();
    config(&mut server, true, 2);
    post(&mut server, "/identify", json!({ "userId": "user-1" }), 200).create();
    let (_temp, path) = project(&server, "");

    run(&path, &["identify", "user-1"]).success();
    run(&path, &["status"])
        .success()
        .stdout(predicate::str::contains("enabled: true"))
        .stdout(predicate::str::contains("user: user-1"))
        .stdout(predicate::str::contains("token: -"))
        .stdout(predicate::str::contains("pending: 0"));
}

#[test]
fn register_activates_push_token() {
    let mut server = Server::new();
    config(&mut server, true, 5);
    post(&mut server, "/identify", json!({ "userId": "user-1" }), 200).create();
    let token = json!({ "userId": "user-1", "token": "push-abc" });
    let register = post(&mut server, "/register", token.clone(), 200)
        .expect(1)
        .create();
    let disable = post(&mut server, "/disable", token, 200).expect(1).create();
    let (_temp, path) = project(&server, "");

    run(&path, &["identify", "user-1"]).success();
    run(&path, &["register"])
        .success()
        .stdout("delivered 1, dropped 0, queued 0\n");
    run(&path, &["token"]).success().stdout("push-abc\n");
    register.assert();

    run(&path, &["disable"])
        .success()
        .stdout("delivered 1, dropped 0, queued 0\n");
    run(&path, &["token"]).success().stdout("\n");
    disable.assert();
}

#[test]
fn rejected_request_is_dropped() {
    let mut server = Server::new();
    config(&mut server, true, 2);
    post(&mut server, "/identify", json!({ "userId": "user-1" }), 200).create();
    let track = post(&mut server, "/track", json!({ "userId": "user-1" }), 400)
        .expect(1)
        .create();
    let (_temp, path) = project(&server, "");

    run(&path, &["identify", "user-1"]).success();
    run(&path, &["track", "signup"])
        .success()
        .stdout("delivered 0, dropped 1, queued 0\n");
    track.assert();
}

#[test]
fn server_error_leaves_request_queued() {
    let mut server = Server::new();
    config(&mut server, true, 3);
    post(&mut server, "/identify", json!({ "userId": "user-1" }), 200).create();
    let track = post(&mut server, "/track", json!({ "userId": "user-1" }), 503)
        .expect_at_least(1)
        .create();
    let (_temp, path) = project(&server, "[delivery]\ninitial_delay_ms = 30000\n");

    run(&path, &["identify", "user-1"]).success();
    run(&path, &["--wait-secs", "1", "track", "signup"])
        .success()
        .stdout("delivered 0, dropped 0, queued 1\n");
    track.assert();

    run(&path, &["status"])
        .success()
        .stdout(predicate::str::contains("pending: 1"));
}

#[test]
fn pair_sends_pin_and_device_token_once() {
    let mut server = Server::new();
    config(&mut server, true, 1);
    let pair = post(
        &mut server,
        "/pair",
        json!({ "pin": "4321", "token": "push-abc" }),
        200,
    )
    .expect(1)
    .create();
    let (_temp, path) = project(&server, "");

    run(&path, &["pair", "4321"]).success().stdout("paired\n");
    pair.assert();
}

#[test]
fn remote_disable_stops_delivery() {
    let mut server = Server::new();
    let config = config(&mut server, false, 3);
    let nothing = server.mock("POST", Matcher::Any).expect(0).create();
    let (_temp, path) = project(&server, "");

    run(&path, &["identify", "user-1"])
        .success()
        .stdout("delivery disabled by remote config\n");
    run(&path, &["register"])
        .success()
        .stdout("delivery disabled by remote config\n");
    run(&path, &["status"])
        .success()
        .stdout(predicate::str::contains("enabled: false"))
        .stdout(predicate::str::contains("user: user-1"))
        .stdout(predicate::str::contains("pending: 0"));

    config.assert();
    nothing.assert();
}
