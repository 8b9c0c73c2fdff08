// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Device pairing. Synchronous with the caller and never queued.

use std::sync::Arc;

use outbound_core::IdentityContext;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gate::ConfigGate;
use crate::transport::{ApiRequest, Credentials, Endpoint, Transport};

/// Body of `POST /pair`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PairPayload<'a> {
    pin: &'a str,
    token: &'a str,
}

pub struct PairingService {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    identity: Arc<IdentityContext>,
    gate: Arc<ConfigGate>,
}

impl PairingService {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        identity: Arc<IdentityContext>,
        gate: Arc<ConfigGate>,
    ) -> Self {
        PairingService {
            transport,
            credentials,
            identity,
            gate,
        }
    }

    /// Exchange `pin` for a paired-device confirmation.
    ///
    /// Returns `Ok(false)` when the server rejects the pin or delivery is
    /// disabled. Only a failure to reach the server is an error.
    pub async fn pair_device(&self, pin: &str) -> Result<bool> {
        if pin.trim().is_empty() {
            return Err(Error::InvalidInput {
                field: "pin",
                reason: "must not be blank".to_string(),
            });
        }
        if !self.gate.is_enabled() {
            debug!("delivery disabled, not pairing");
            return Ok(false);
        }

        let token = self.identity.device_token();
        let body = serde_json::to_value(PairPayload { pin, token: &token })
            .map_err(outbound_core::Error::from)?;
        let request = ApiRequest::post(Endpoint::Pair, body).with_credentials(&self.credentials);

        let response = self.transport.send(request).await?;
        if response.is_success() {
            info!("device paired");
            Ok(true)
        } else {
            warn!(status = response.status, "pairing rejected");
            Ok(false)
        }
    }
}

#[cfg(test)]
#[path = "pairing_tests.rs"]
mod tests;
