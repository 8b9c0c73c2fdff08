// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for outbound-core operations.

use thiserror::Error;

/// All possible errors that can occur in outbound-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`] on a blank field.
    pub fn blank(field: &'static str) -> Self {
        Error::InvalidInput {
            field,
            reason: "must not be blank".to_string(),
        }
    }
}

/// A specialized Result type for outbound-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
