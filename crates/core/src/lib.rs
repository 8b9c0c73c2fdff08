// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbound-core: storage and state for the outbound delivery pipeline
//!
//! This crate provides the data model, the durable request queue, the
//! preference store, the cached remote config, and the identity context.
//! The `outbound` crate builds the network-facing pipeline on top of it.

pub mod config;
pub mod error;
pub mod identity;
pub mod prefs;
pub mod queue;
pub mod request;

pub use config::{ConfigCache, ConfigResponse, RemoteConfig};
pub use error::{Error, Result};
pub use identity::IdentityContext;
pub use prefs::{FilePrefs, MemoryPrefs, PrefStore};
pub use queue::QueueStore;
pub use request::{
    Event, IdentifyPayload, NewRequest, PendingRequest, RequestId, RequestKind, TokenPayload,
    TrackPayload, User,
};
