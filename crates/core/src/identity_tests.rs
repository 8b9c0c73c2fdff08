// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::prefs::MemoryPrefs;

fn prefs() -> Arc<dyn PrefStore> {
    Arc::new(MemoryPrefs::new())
}

#[test]
fn fresh_context_has_no_identity_and_empty_token() {
    let identity = IdentityContext::load(prefs(), None).unwrap();
    assert_eq!(identity.user_id(), None);
    assert_eq!(identity.current_token(), "");
    assert!(!identity.device_token().is_empty());
}

#[test]
fn device_token_is_stable_across_loads() {
    let prefs = prefs();
    let first = IdentityContext::load(Arc::clone(&prefs), None)
        .unwrap()
        .device_token();
    let second = IdentityContext::load(prefs, None).unwrap().device_token();
    assert_eq!(first, second);
}

#[test]
fn push_token_overrides_generated_token() {
    let identity = IdentityContext::load(prefs(), Some("fcm-token")).unwrap();
    assert_eq!(identity.device_token(), "fcm-token");
}

#[test]
fn blank_push_token_is_ignored() {
    let identity = IdentityContext::load(prefs(), Some("  ")).unwrap();
    assert_ne!(identity.device_token().trim(), "");
}

#[test]
fn token_activates_only_for_current_user() {
    let identity = IdentityContext::load(prefs(), None).unwrap();
    identity.set_identity("u-1").unwrap();

    assert!(!identity.activate_token("u-2", "tok").unwrap());
    assert_eq!(identity.current_token(), "");

    assert!(identity.activate_token("u-1", "tok").unwrap());
    assert_eq!(identity.current_token(), "tok");
}

#[test]
fn switching_user_clears_active_token() {
    let identity = IdentityContext::load(prefs(), None).unwrap();
    identity.set_identity("u-1").unwrap();
    identity.activate_token("u-1", "tok").unwrap();

    // Same user keeps the token
    identity.set_identity("u-1").unwrap();
    assert_eq!(identity.current_token(), "tok");

    identity.set_identity("u-2").unwrap();
    assert_eq!(identity.user_id().as_deref(), Some("u-2"));
    assert_eq!(identity.current_token(), "");
}

#[test]
fn deactivate_clears_token_for_current_user() {
    let identity = IdentityContext::load(prefs(), None).unwrap();
    identity.set_identity("u-1").unwrap();
    identity.activate_token("u-1", "tok").unwrap();

    assert!(!identity.deactivate_token("u-2").unwrap());
    assert_eq!(identity.current_token(), "tok");

    assert!(identity.deactivate_token("u-1").unwrap());
    assert_eq!(identity.current_token(), "");
    assert!(!identity.deactivate_token("u-1").unwrap());
}

#[test]
fn identity_and_token_persist() {
    let prefs = prefs();
    {
        let identity = IdentityContext::load(Arc::clone(&prefs), None).unwrap();
        identity.set_identity("u-1").unwrap();
        let token = identity.device_token();
        identity.activate_token("u-1", &token).unwrap();
    }

    let identity = IdentityContext::load(prefs, None).unwrap();
    assert_eq!(identity.user_id().as_deref(), Some("u-1"));
    assert_eq!(identity.current_token(), identity.device_token());
}

#[test]
fn changed_push_token_invalidates_active_token() {
    let prefs = prefs();
    {
        let identity = IdentityContext::load(Arc::clone(&prefs), Some("old")).unwrap();
        identity.set_identity("u-1").unwrap();
        identity.activate_token("u-1", "old").unwrap();
    }

    let identity = IdentityContext::load(prefs, Some("new")).unwrap();
    assert_eq!(identity.device_token(), "new");
    assert_eq!(identity.current_token(), "");
}

#[test]
fn orphaned_active_token_is_dropped() {
    let prefs = prefs();
    prefs.set(ACTIVE_TOKEN_KEY, "tok").unwrap();

    let identity = IdentityContext::load(Arc::clone(&prefs), None).unwrap();
    assert_eq!(identity.current_token(), "");
    assert_eq!(prefs.get(ACTIVE_TOKEN_KEY).unwrap(), None);
}
