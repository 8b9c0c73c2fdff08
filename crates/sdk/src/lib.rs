// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbound: durable event delivery to the outbound API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Outbound   │────►│ QueueStore  │◄────│   Worker    │
//! │  (façade)   │     │  (SQLite)   │     │  (task)     │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │ ConfigGate  │────────────────────────►│  Transport  │
//! │ Pairing     │                         │   (trait)   │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! Actions return once the request is durably queued. The worker delivers
//! queued requests in order, retrying transient failures with exponential
//! backoff, and only while the remote config reports the pipeline enabled.

mod client;
mod error;
mod gate;
mod pairing;
mod transport;
mod worker;

pub use client::{AppContext, Outbound};
pub use error::{DeliveryError, Error, Result};
pub use gate::ConfigGate;
pub use pairing::PairingService;
pub use transport::{
    ApiRequest, ApiResponse, Credentials, Endpoint, HttpTransport, Method, Transport,
    TransportError, TransportResult,
};
pub use worker::{
    classify_status, classify_transport_error, DeliveryEvent, DeliveryObserver, DeliverySettings,
};

pub use outbound_core::{Event, PendingRequest, RemoteConfig, RequestId, RequestKind, User};

#[cfg(test)]
mod test_helpers;
