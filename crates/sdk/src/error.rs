// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the outbound pipeline.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by the public API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: call initialize first")]
    Uninitialized,

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("no identity: call identify first")]
    NoIdentity,

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error(transparent)]
    Core(outbound_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<outbound_core::Error> for Error {
    fn from(err: outbound_core::Error) -> Self {
        match err {
            outbound_core::Error::InvalidInput { field, reason } => {
                Error::InvalidInput { field, reason }
            }
            other => Error::Core(other),
        }
    }
}

/// A specialized Result type for public API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a queued request could not be delivered.
///
/// Delivery errors never reach the caller of an action: transient ones are
/// retried by the worker, permanent ones are reported to the
/// [`DeliveryObserver`](crate::worker::DeliveryObserver).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
