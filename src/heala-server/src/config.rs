// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Relay configuration.
//!
//! Values come from an optional YAML file named by `HEALA_CONFIG`, then the
//! environment overrides individual keys. The Gemini key is mandatory.

use crate::HealaError;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_UPSTREAM_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5001";
/// Matches the 20 MiB JSON limit the mobile client was built against.
pub const DEFAULT_BODY_LIMIT: usize = 20 * 1024 * 1024;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 120;

pub const ENV_CONFIG_PATH: &str = "HEALA_CONFIG";
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_UPSTREAM_URL: &str = "GEMINI_API_URL";
pub const ENV_LISTEN_ADDR: &str = "HEALA_LISTEN_ADDR";
pub const ENV_BODY_LIMIT: &str = "HEALA_BODY_LIMIT";
pub const ENV_UPSTREAM_TIMEOUT: &str = "HEALA_UPSTREAM_TIMEOUT_SECS";

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

fn default_upstream_timeout() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server-held Gemini credential, appended as the `key` query parameter.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"<redacted>")
            .field("upstream_url", &self.upstream_url)
            .field("listen_addr", &self.listen_addr)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            upstream_url: default_upstream_url(),
            listen_addr: default_listen_addr(),
            body_limit_bytes: default_body_limit(),
            upstream_timeout_secs: default_upstream_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, HealaError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| HealaError::ConfigError(format!("Failed to parse config YAML: {e}")))
    }

    /// Load from `HEALA_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self, HealaError> {
        let base = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => {
                info!("Loading relay config from {}", path);
                let yaml = std::fs::read_to_string(&path).map_err(|e| {
                    HealaError::ConfigError(format!("Failed to read config file {path}: {e}"))
                })?;
                Self::from_yaml_str(&yaml)?
            }
            Err(_) => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, HealaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(url) = lookup(ENV_UPSTREAM_URL) {
            self.upstream_url = url;
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.listen_addr = addr;
        }
        if let Some(limit) = lookup(ENV_BODY_LIMIT) {
            self.body_limit_bytes = limit.parse().map_err(|e| {
                HealaError::ConfigError(format!("{ENV_BODY_LIMIT} must be a byte count: {e}"))
            })?;
        }
        if let Some(secs) = lookup(ENV_UPSTREAM_TIMEOUT) {
            self.upstream_timeout_secs = secs.parse().map_err(|e| {
                HealaError::ConfigError(format!("{ENV_UPSTREAM_TIMEOUT} must be seconds: {e}"))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), HealaError> {
        if self.api_key.trim().is_empty() {
            return Err(HealaError::ConfigError(format!(
                "{ENV_API_KEY} is not set"
            )));
        }
        if !self.upstream_url.starts_with("http://") && !self.upstream_url.starts_with("https://")
        {
            return Err(HealaError::ConfigError(format!(
                "Upstream URL must be http(s): {}",
                self.upstream_url
            )));
        }
        if self.body_limit_bytes == 0 {
            return Err(HealaError::ConfigError(
                "Body limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
