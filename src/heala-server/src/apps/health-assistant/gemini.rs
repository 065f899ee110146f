// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

// Gemini generateContent client.
// Talks either to the hosted API directly (key in the query string) or to the
// heala relay, which appends the key server-side.

use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::config::DEFAULT_UPSTREAM_URL;
use crate::HealaError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

// ============================================
// Configuration
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiEndpoint {
    /// Hosted API; the key is sent with every request.
    Direct { url: String, api_key: String },
    /// Relay `POST /analyze` URL; no key leaves the server.
    Relay { url: String },
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: GeminiEndpoint,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn direct(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: GeminiEndpoint::Direct {
                url: DEFAULT_UPSTREAM_URL.to_string(),
                api_key: api_key.into(),
            },
            timeout: Duration::from_secs(120),
        }
    }

    /// `base_url` is the relay root, e.g. `http://10.0.2.2:5001`.
    pub fn relay(base_url: &str) -> Self {
        Self {
            endpoint: GeminiEndpoint::Relay {
                url: format!("{}/analyze", base_url.trim_end_matches('/')),
            },
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_url(mut self, new_url: impl Into<String>) -> Self {
        match &mut self.endpoint {
            GeminiEndpoint::Direct { url, .. } | GeminiEndpoint::Relay { url } => {
                *url = new_url.into()
            }
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================
// Model seam
// ============================================

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Send a request and return the raw response body.
    async fn generate_raw(&self, request: &GenerateContentRequest) -> Result<String, HealaError>;

    /// Send a request and return the first candidate text, if any.
    /// A body that is not a generateContent response is an error.
    async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<Option<String>, HealaError> {
        let body = self.generate_raw(request).await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            HealaError::RemoteCallFailure(format!("Failed to parse Gemini response: {e}"))
        })?;
        Ok(parsed.first_text().map(str::to_string))
    }
}

// ============================================
// HTTP implementation
// ============================================

pub struct GeminiClient {
    pub client: reqwest::Client,
    pub config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, HealaError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| HealaError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn request_builder(&self) -> reqwest::RequestBuilder {
        match &self.config.endpoint {
            GeminiEndpoint::Direct { url, api_key } => {
                self.client.post(url).query(&[("key", api_key.as_str())])
            }
            GeminiEndpoint::Relay { url } => self.client.post(url),
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_raw(&self, request: &GenerateContentRequest) -> Result<String, HealaError> {
        let parts: usize = request.contents.iter().map(|c| c.parts.len()).sum();
        info!("Calling Gemini with {} part(s)", parts);

        let response = self
            .request_builder()
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| HealaError::RemoteCallFailure(format!("Gemini request failed: {e}")))?;

        // Get status before consuming the response
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            HealaError::RemoteCallFailure(format!("Failed to read Gemini response: {e}"))
        })?;

        if !status.is_success() {
            warn!("Gemini returned status {}", status);
            return Err(HealaError::RemoteCallFailure(format!(
                "Gemini error {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        debug!("Gemini response: {} bytes", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{serve_ephemeral, unused_addr};
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn echo_key(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        let text = query
            .get("key")
            .cloned()
            .unwrap_or_else(|| "no-key".to_string());
        Json(json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }))
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "upstream down")
    }

    async fn not_json() -> &'static str {
        "plain words"
    }

    async fn start() -> std::net::SocketAddr {
        serve_ephemeral(
            Router::new()
                .route("/gen", post(echo_key))
                .route("/analyze", post(echo_key))
                .route("/broken", post(broken))
                .route("/text", post(not_json)),
        )
        .await
    }

    #[tokio::test]
    async fn test_direct_sends_key() {
        let addr = start().await;
        let client =
            GeminiClient::new(GeminiConfig::direct("k-123").with_url(format!("http://{addr}/gen")))
                .unwrap();
        let text = client
            .generate(&GenerateContentRequest::text("hi"))
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("k-123"));
    }

    #[tokio::test]
    async fn test_relay_omits_key() {
        let addr = start().await;
        let client = GeminiClient::new(GeminiConfig::relay(&format!("http://{addr}/"))).unwrap();
        let text = client
            .generate(&GenerateContentRequest::text("hi"))
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("no-key"));
    }

    #[tokio::test]
    async fn test_non_success_is_remote_failure() {
        let addr = start().await;
        let client =
            GeminiClient::new(GeminiConfig::direct("k").with_url(format!("http://{addr}/broken")))
                .unwrap();
        let err = client
            .generate_raw(&GenerateContentRequest::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, HealaError::RemoteCallFailure(_)));
    }

    #[tokio::test]
    async fn test_raw_body_vs_parsed() {
        let addr = start().await;
        let client =
            GeminiClient::new(GeminiConfig::direct("k").with_url(format!("http://{addr}/text")))
                .unwrap();
        let request = GenerateContentRequest::text("hi");
        assert_eq!(client.generate_raw(&request).await.unwrap(), "plain words");
        assert!(client.generate(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_is_remote_failure() {
        let dead = unused_addr().await;
        let client =
            GeminiClient::new(GeminiConfig::direct("k").with_url(format!("http://{dead}/gen")))
                .unwrap();
        let err = client
            .generate(&GenerateContentRequest::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, HealaError::RemoteCallFailure(_)));
    }
}
