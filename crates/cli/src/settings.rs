// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! obctl settings.
//!
//! Settings are read from a TOML file, by default
//! `<config dir>/outbound/config.toml`:
//!
//! ```toml
//! base_url = "https://api.example.com"
//! api_key = "..."
//! client_id = "..."
//! # data_dir = "/var/lib/outbound"   (relative paths resolve against this file)
//!
//! [delivery]
//! max_attempts = 10
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use outbound::{AppContext, DeliverySettings};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const APP_DIR_NAME: &str = "outbound";
const SETTINGS_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the API, e.g. `https://api.example.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub client_id: String,
    /// Directory for the queue database and preferences.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    /// Push token to register; a stable generated token when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub delivery: DeliverySettings,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

fn default_platform() -> String {
    "rust".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Default settings file location.
pub fn default_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
        .ok_or(Error::NoConfigDir)
}

impl Settings {
    /// Load settings from `path`, or from [`default_path`] when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_path()?,
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SettingsNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut settings = Self::parse(&content)?;
        if settings.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                settings.data_dir = parent.join(&settings.data_dir);
            }
        }
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| Error::Settings(format!("failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("base_url", &self.base_url),
            ("api_key", &self.api_key),
            ("client_id", &self.client_id),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Settings(format!("{name} must not be blank")));
            }
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Settings(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Settings("timeout_secs must be at least 1".to_string()));
        }
        if self.delivery.max_attempts == 0 {
            return Err(Error::Settings(
                "delivery.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Application context handed to `Outbound::initialize`.
    pub fn app_context(&self) -> AppContext {
        let app = AppContext::new(&self.data_dir)
            .with_platform(&self.platform)
            .with_app_version(&self.app_version)
            .with_delivery(self.delivery);
        match &self.push_token {
            Some(token) => app.with_push_token(token),
            None => app,
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
