// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use std::fmt;
use std::time::Duration;

pub mod apps {
    #[cfg(feature = "health-assistant")]
    #[path = "health-assistant/mod.rs"]
    pub mod health_assistant;
}

pub mod app {
    #[cfg(feature = "health-assistant")]
    pub use crate::apps::health_assistant::*;
}

pub mod common;
pub mod config;
pub mod relay;

pub use config::ServerConfig;

/// Relay state shared by every request. Immutable after boot.
pub struct AppState {
    /// Upstream location, credential and limits.
    pub config: ServerConfig,
    /// Pooled client used to reach the Gemini API.
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, HealaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| HealaError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

/// Implement IntoResponse for HealaError.
impl IntoResponse for HealaError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            HealaError::ValidationError(e) => (StatusCode::BAD_REQUEST, e),
            HealaError::PermissionDenied(e) => (StatusCode::FORBIDDEN, e),
            HealaError::ClassificationMismatch(e) => (StatusCode::UNPROCESSABLE_ENTITY, e),
            HealaError::RemoteCallFailure(e) => (StatusCode::BAD_GATEWAY, e),
            HealaError::ConfigError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
            HealaError::GenericError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
        };
        let body = Json(json!({
            "error": error_message,
        }));
        (status, body).into_response()
    }
}

/// Heala errors enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealaError {
    /// Gallery or location access refused.
    PermissionDenied(String),
    /// Missing or malformed user input.
    ValidationError(String),
    /// Network failure or non-2xx answer from a remote collaborator.
    RemoteCallFailure(String),
    /// Document handed to the wrong analyzer.
    ClassificationMismatch(String),
    ConfigError(String),
    GenericError(String),
}

impl fmt::Display for HealaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealaError::PermissionDenied(e) => write!(f, "Permission denied: {e}"),
            HealaError::ValidationError(e) => write!(f, "Invalid input: {e}"),
            HealaError::RemoteCallFailure(e) => write!(f, "Remote call failed: {e}"),
            HealaError::ClassificationMismatch(e) => write!(f, "Classification mismatch: {e}"),
            HealaError::ConfigError(e) => write!(f, "Configuration error: {e}"),
            HealaError::GenericError(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for HealaError {}


#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_error_status_mapping() {
        let cases = [
            (HealaError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (HealaError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (
                HealaError::ClassificationMismatch("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (HealaError::RemoteCallFailure("x".into()), StatusCode::BAD_GATEWAY),
            (HealaError::ConfigError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_error_display() {
        let e = HealaError::RemoteCallFailure("timeout".to_string());
        assert_eq!(e.to_string(), "Remote call failed: timeout");
        let e = HealaError::GenericError("plain".to_string());
        assert_eq!(e.to_string(), "plain");
    }
}
