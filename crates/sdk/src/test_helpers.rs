// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for pipeline tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;

use outbound_core::{Event, User};
use serde_json::{json, Value};

use crate::client::AppContext;
use crate::transport::{
    ApiRequest, ApiResponse, Endpoint, Transport, TransportError, TransportResult,
};
use crate::worker::DeliverySettings;

/// What the mock answers for a call.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Json(u16, Value),
    Fail(TransportError),
}

impl Reply {
    fn into_result(self) -> TransportResult<ApiResponse> {
        match self {
            Reply::Status(status) => Ok(ApiResponse::new(status)),
            Reply::Json(status, body) => Ok(ApiResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            }),
            Reply::Fail(err) => Err(err),
        }
    }
}

/// Mock transport for testing without a server.
///
/// Each endpoint answers with its scripted replies first, then with its
/// default reply. Every request is recorded.
pub struct MockTransport {
    scripted: Mutex<HashMap<Endpoint, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<Endpoint, Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// A server whose config reports `enabled` and which accepts everything.
    pub fn with_config(enabled: bool) -> Self {
        let mock = MockTransport {
            scripted: Mutex::new(HashMap::new()),
            defaults: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        };
        mock.set_default(
            Endpoint::Config,
            Reply::Json(200, json!({ "enabled": enabled })),
        );
        mock
    }

    pub fn enabled() -> Self {
        Self::with_config(true)
    }

    pub fn disabled() -> Self {
        Self::with_config(false)
    }

    pub fn set_default(&self, endpoint: Endpoint, reply: Reply) {
        self.defaults.lock().unwrap().insert(endpoint, reply);
    }

    /// Queue a one-shot reply, answered before the default.
    pub fn push_reply(&self, endpoint: Endpoint, reply: Reply) {
        self.scripted
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(reply);
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to `endpoint`.
    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.endpoint == endpoint)
            .collect()
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.requests_to(endpoint).len()
    }

    /// Endpoints hit, in order, excluding config fetches.
    pub fn delivered(&self) -> Vec<Endpoint> {
        self.requests()
            .into_iter()
            .map(|r| r.endpoint)
            .filter(|e| *e != Endpoint::Config)
            .collect()
    }

    fn reply_for(&self, endpoint: Endpoint) -> Reply {
        if let Some(reply) = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        self.defaults
            .lock()
            .unwrap()
            .get(&endpoint)
            .cloned()
            .unwrap_or(Reply::Status(200))
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<ApiResponse>> + Send + '_>> {
        Box::pin(async move {
            let reply = self.reply_for(request.endpoint);
            self.requests.lock().unwrap().push(request);
            reply.into_result()
        })
    }
}

/// Delivery settings with short delays so retry tests stay fast.
pub fn fast_delivery() -> DeliverySettings {
    DeliverySettings {
        max_attempts: 3,
        initial_delay_ms: 5,
        max_delay_ms: 20,
    }
}

pub fn test_app(dir: &Path) -> AppContext {
    AppContext::new(dir)
        .with_platform("test")
        .with_app_version("1.2.3")
        .with_delivery(fast_delivery())
}

pub fn test_user() -> User {
    User::new("user-1")
        .with_name("Ada", "Lovelace")
        .with_email("ada@example.com")
}

pub fn test_event() -> Event {
    Event::new("button_tapped").with_property("screen", "home")
}
