// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Config gate: decides whether the pipeline may enqueue and send.

use std::sync::Arc;

use outbound_core::{ConfigCache, ConfigResponse, RemoteConfig};
use tracing::{info, warn};

use crate::transport::{ApiRequest, Credentials, Endpoint, Transport, TransportError};

/// Remote config fetched once per initialization, read on every action.
pub struct ConfigGate {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    cache: ConfigCache,
    platform: String,
    app_version: String,
}

impl ConfigGate {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        cache: ConfigCache,
        platform: &str,
        app_version: &str,
    ) -> Self {
        ConfigGate {
            transport,
            credentials,
            cache,
            platform: platform.to_string(),
            app_version: app_version.to_string(),
        }
    }

    /// Fetch the remote config and cache it.
    ///
    /// Never fails: on any error the cached config is kept and returned,
    /// or disabled if nothing was ever cached.
    pub async fn fetch(&self) -> RemoteConfig {
        match self.request_config().await {
            Ok(config) => {
                if let Err(e) = self.cache.store(config) {
                    warn!(error = %e, "failed to cache remote config");
                    return self.cache.effective();
                }
                info!(enabled = config.enabled, "remote config fetched");
                config
            }
            Err(e) => {
                let fallback = self.cache.effective();
                warn!(
                    error = %e,
                    cached = self.cache.get().is_some(),
                    enabled = fallback.enabled,
                    "config fetch failed, using cached config"
                );
                fallback
            }
        }
    }

    async fn request_config(&self) -> Result<RemoteConfig, TransportError> {
        let request = ApiRequest::get(Endpoint::Config)
            .with_query("platform", self.platform.as_str())
            .with_query("version", self.app_version.as_str())
            .with_credentials(&self.credentials);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(TransportError::RequestFailed(format!(
                "HTTP {}",
                response.status
            )));
        }
        let body: ConfigResponse = response.json()?;
        Ok(RemoteConfig::fetched(body.enabled))
    }

    /// Whether delivery is enabled. Reads cached state only.
    pub fn is_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub fn current(&self) -> RemoteConfig {
        self.cache.effective()
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
