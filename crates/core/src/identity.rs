// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Identity context: the identified user and their push token.
//!
//! Three values are tracked, all persisted in the [`PrefStore`]:
//! - the current user id, set by `identify`
//! - the device token, stable for the install (or supplied by the host app)
//! - the active token, non-empty only once a register for the current user
//!   has been delivered
//!
//! Identifying a different user deactivates the token; re-identifying the
//! same user keeps it.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::Result;
use crate::prefs::PrefStore;

const USER_KEY: &str = "identity.user_id";
const ACTIVE_TOKEN_KEY: &str = "identity.active_token";
const DEVICE_TOKEN_KEY: &str = "identity.device_token";

#[derive(Debug, Default)]
struct IdentityState {
    user_id: Option<String>,
    active_token: Option<String>,
    device_token: String,
}

/// Shared identity state. Cheap to read; writes go to the preference store
/// before memory is updated.
pub struct IdentityContext {
    prefs: Arc<dyn PrefStore>,
    state: RwLock<IdentityState>,
}

impl IdentityContext {
    /// Load identity from the preference store.
    ///
    /// `push_token` overrides the device token when the host app has one;
    /// otherwise the stored token is reused, or a new one generated.
    pub fn load(prefs: Arc<dyn PrefStore>, push_token: Option<&str>) -> Result<Self> {
        let user_id = prefs.get(USER_KEY)?;
        let mut active_token = prefs.get(ACTIVE_TOKEN_KEY)?;

        let stored_device = prefs.get(DEVICE_TOKEN_KEY)?;
        let device_token = match (push_token, stored_device) {
            (Some(token), stored) if !token.trim().is_empty() => {
                if stored.as_deref() != Some(token) {
                    prefs.set(DEVICE_TOKEN_KEY, token)?;
                    // A token registered under another device token is stale
                    if active_token.take().is_some() {
                        prefs.remove(ACTIVE_TOKEN_KEY)?;
                    }
                }
                token.to_string()
            }
            (_, Some(stored)) => stored,
            (_, None) => {
                let token = uuid::Uuid::new_v4().simple().to_string();
                prefs.set(DEVICE_TOKEN_KEY, &token)?;
                debug!("generated device token");
                token
            }
        };

        // An active token without a user cannot be valid
        if user_id.is_none() && active_token.take().is_some() {
            prefs.remove(ACTIVE_TOKEN_KEY)?;
        }

        Ok(IdentityContext {
            prefs,
            state: RwLock::new(IdentityState {
                user_id,
                active_token,
                device_token,
            }),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, IdentityState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IdentityState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current identity.
    pub fn set_identity(&self, user_id: &str) -> Result<()> {
        let mut state = self.write();
        if state.user_id.as_deref() == Some(user_id) {
            return Ok(());
        }

        self.prefs.set(USER_KEY, user_id)?;
        if state.active_token.is_some() {
            self.prefs.remove(ACTIVE_TOKEN_KEY)?;
        }
        info!(user_id = %user_id, "identity changed");
        state.user_id = Some(user_id.to_string());
        state.active_token = None;
        Ok(())
    }

    /// The identified user, if any.
    pub fn user_id(&self) -> Option<String> {
        self.read().user_id.clone()
    }

    /// The token used when registering this device for push.
    pub fn device_token(&self) -> String {
        self.read().device_token.clone()
    }

    /// The active push token, or `""` when none is active.
    pub fn current_token(&self) -> String {
        self.read().active_token.clone().unwrap_or_default()
    }

    /// Mark `token` active after a register for `user_id` was delivered.
    ///
    /// Ignored if the identity has changed since the request was queued.
    pub fn activate_token(&self, user_id: &str, token: &str) -> Result<bool> {
        let mut state = self.write();
        if state.user_id.as_deref() != Some(user_id) {
            debug!(user_id = %user_id, "ignoring register for previous identity");
            return Ok(false);
        }
        self.prefs.set(ACTIVE_TOKEN_KEY, token)?;
        state.active_token = Some(token.to_string());
        Ok(true)
    }

    /// Clear the active token after a disable for `user_id` was delivered.
    pub fn deactivate_token(&self, user_id: &str) -> Result<bool> {
        let mut state = self.write();
        if state.user_id.as_deref() != Some(user_id) || state.active_token.is_none() {
            return Ok(false);
        }
        self.prefs.remove(ACTIVE_TOKEN_KEY)?;
        state.active_token = None;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
