// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in obctl.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("settings file not found: {0}\n  hint: create it or pass --config <path>")]
    SettingsNotFound(String),

    #[error("cannot locate the config directory\n  hint: pass --config <path>")]
    NoConfigDir,

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Outbound(#[from] outbound::Error),
}

impl From<outbound::TransportError> for Error {
    fn from(err: outbound::TransportError) -> Self {
        Error::Outbound(err.into())
    }
}

/// A specialized Result type for obctl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
