// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote configuration and its local cache.
//!
//! The remote config decides whether the pipeline is enabled. It is fetched
//! once per initialization and cached in the [`PrefStore`]; a missing cache
//! entry means disabled.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::prefs::PrefStore;

const CONFIG_KEY: &str = "config.remote";

/// Remote configuration as last fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub enabled: bool,
    /// When the config was fetched. `None` only for [`RemoteConfig::disabled`].
    pub fetched_at: Option<DateTime<Utc>>,
}

impl RemoteConfig {
    /// A freshly fetched config.
    pub fn fetched(enabled: bool) -> Self {
        RemoteConfig {
            enabled,
            fetched_at: Some(Utc::now()),
        }
    }

    /// The config used when nothing was ever fetched.
    pub fn disabled() -> Self {
        RemoteConfig {
            enabled: false,
            fetched_at: None,
        }
    }
}

/// Body returned by `GET /config`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigResponse {
    pub enabled: bool,
}

/// In-memory view of the cached config, backed by a [`PrefStore`].
pub struct ConfigCache {
    prefs: Arc<dyn PrefStore>,
    current: RwLock<Option<RemoteConfig>>,
}

impl ConfigCache {
    /// Load whatever config the preference store holds.
    ///
    /// An unreadable cached entry is discarded and treated as absent.
    pub fn load(prefs: Arc<dyn PrefStore>) -> Result<Self> {
        let current = match prefs.get(CONFIG_KEY)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable cached config");
                    prefs.remove(CONFIG_KEY)?;
                    None
                }
            },
            None => None,
        };

        Ok(ConfigCache {
            prefs,
            current: RwLock::new(current),
        })
    }

    /// The cached config, if any.
    pub fn get(&self) -> Option<RemoteConfig> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached config, or disabled if nothing is cached.
    pub fn effective(&self) -> RemoteConfig {
        self.get().unwrap_or_else(RemoteConfig::disabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.effective().enabled
    }

    /// Replace the cached config, persisting it first.
    pub fn store(&self, config: RemoteConfig) -> Result<()> {
        self.prefs
            .set(CONFIG_KEY, &serde_json::to_string(&config)?)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
