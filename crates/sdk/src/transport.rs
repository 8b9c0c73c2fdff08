// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the outbound API.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP requests via reqwest for production
//! - Mock transports for unit testing
//!
//! The transport only moves bytes; deciding whether a status code means
//! success, retry or drop is left to the caller.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use outbound_core::RequestKind;
use serde::de::DeserializeOwned;
use serde_json::Value;

const API_KEY_HEADER: &str = "X-Api-Key";
const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Could not reach the server.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other failure while sending or reading the response.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// API endpoints, relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Config,
    Identify,
    Track,
    Register,
    Disable,
    Pair,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Config => "/config",
            Endpoint::Identify => "/identify",
            Endpoint::Track => "/track",
            Endpoint::Register => "/register",
            Endpoint::Disable => "/disable",
            Endpoint::Pair => "/pair",
        }
    }

    /// The endpoint a queued request is posted to.
    pub fn for_kind(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Identify => Endpoint::Identify,
            RequestKind::Track => Endpoint::Track,
            RequestKind::Register => Endpoint::Register,
            RequestKind::Disable => Endpoint::Disable,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// API credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub client_id: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, client_id: impl Into<String>) -> Self {
        Credentials {
            api_key: api_key.into(),
            client_id: client_id.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// A single API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: Endpoint) -> Self {
        ApiRequest {
            method: Method::Get,
            endpoint,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(endpoint: Endpoint, body: Value) -> Self {
        ApiRequest {
            method: Method::Post,
            endpoint,
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach the API key and client id headers.
    pub fn with_credentials(self, credentials: &Credentials) -> Self {
        self.with_header(API_KEY_HEADER, credentials.api_key.clone())
            .with_header(CLIENT_ID_HEADER, credentials.client_id.clone())
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        ApiResponse {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Serialization(e.to_string()))
    }
}

/// Transport trait for request/response API calls.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send + Sync {
    /// Perform one call. Any HTTP status is `Ok`; only failures to complete
    /// the exchange are errors.
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<ApiResponse>> + Send + '_>>;
}

/// HTTP transport implementation using reqwest.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(HttpTransport {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<ApiResponse>> + Send + '_>> {
        Box::pin(async move {
            let url = format!("{}{}", self.base_url, request.endpoint.path());
            let mut builder = match request.method {
                Method::Get => self.client.get(&url),
                Method::Post => self.client.post(&url),
            };
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            tracing::trace!(url = %url, method = ?request.method, "sending request");
            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(map_reqwest_error)?;

            Ok(ApiResponse {
                status,
                body: body.to_vec(),
            })
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::ConnectionFailed(err.to_string())
    } else {
        TransportError::RequestFailed(err.to_string())
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
