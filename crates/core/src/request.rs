// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound request types and their wire payloads.
//!
//! A [`PendingRequest`] is what the queue store persists: a kind, an opaque
//! JSON payload, and delivery bookkeeping. The payload structs below are the
//! exact bodies posted to the API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// The kind of queued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Identify,
    Track,
    Register,
    Disable,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Identify => "identify",
            RequestKind::Track => "track",
            RequestKind::Register => "register",
            RequestKind::Disable => "disable",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "identify" => Ok(RequestKind::Identify),
            "track" => Ok(RequestKind::Track),
            "register" => Ok(RequestKind::Register),
            "disable" => Ok(RequestKind::Disable),
            other => Err(Error::CorruptedData(format!(
                "unknown request kind '{other}'"
            ))),
        }
    }
}

/// Opaque, monotonically increasing identifier assigned by the queue store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub(crate) i64);

impl RequestId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request about to be appended to the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    pub kind: RequestKind,
    pub payload: Vec<u8>,
    pub enqueued_at: DateTime<Utc>,
}

impl NewRequest {
    /// Serialize `payload` as JSON and stamp the request with the current time.
    pub fn new<T: Serialize>(kind: RequestKind, payload: &T) -> Result<Self> {
        Ok(NewRequest {
            kind,
            payload: serde_json::to_vec(payload)?,
            enqueued_at: Utc::now(),
        })
    }
}

/// A request owned by the queue store until it is delivered or dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    pub payload: Vec<u8>,
    pub enqueued_at: DateTime<Utc>,
    /// Number of failed delivery attempts so far.
    pub attempt: u32,
}

impl PendingRequest {
    /// Decode the payload into its typed form.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// The payload as a JSON value, ready to be posted.
    pub fn body(&self) -> Result<Value> {
        self.decode()
    }
}

/// A user as passed to `identify`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        User {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::blank("user id"));
        }
        Ok(())
    }
}

/// A tracked event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Event {
            name: name.into(),
            properties: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::blank("event name"));
        }
        Ok(())
    }
}

/// Body of `POST /identify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl From<&User> for IdentifyPayload {
    fn from(user: &User) -> Self {
        IdentifyPayload {
            user_id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            attributes: user.attributes.clone(),
        }
    }
}

/// Body of `POST /track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPayload {
    pub user_id: String,
    pub event: Event,
}

/// Body of `POST /register` and `POST /disable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub user_id: String,
    pub token: String,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
