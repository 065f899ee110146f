// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Single-route Gemini relay.
//!
//! `POST /analyze` forwards the JSON body to the configured upstream with the
//! server-held key appended, then returns the upstream status and body as-is.
//! There is no inbound authentication, rate limiting or schema validation.

use crate::common::{health_check, liveness};
use crate::{AppState, HealaError};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to contact Gemini API";

/// Build the relay router.
pub fn relay_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/", get(liveness))
        .route("/health_check", get(health_check))
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve the relay in the background.
/// Returns the bound address.
pub async fn spawn_relay_server(state: Arc<AppState>) -> Result<SocketAddr, HealaError> {
    let listener = TcpListener::bind(&state.config.listen_addr)
        .await
        .map_err(|e| {
            HealaError::ConfigError(format!(
                "Failed to bind relay on {}: {e}",
                state.config.listen_addr
            ))
        })?;
    let addr = listener
        .local_addr()
        .map_err(|e| HealaError::GenericError(format!("Failed to read bound address: {e}")))?;

    info!("Relay listening on {}", addr);

    let app = relay_router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            error!("Relay server failed: {e}");
        }
    });

    Ok(addr)
}

/// Forward a generateContent request to Gemini.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let request_id = Uuid::new_v4();
    info!(%request_id, "Relaying generateContent request");

    match forward(&state, &body).await {
        Ok(response) => response,
        Err(e) => {
            error!(%request_id, "Gemini API error: {e}");
            upstream_failure()
        }
    }
}

async fn forward(state: &AppState, body: &serde_json::Value) -> Result<Response, HealaError> {
    let response = state
        .client
        .post(&state.config.upstream_url)
        .query(&[("key", state.config.api_key.as_str())])
        .json(body)
        .send()
        .await
        .map_err(|e| HealaError::RemoteCallFailure(format!("Gemini request failed: {e}")))?;

    // Get status and content type before consuming the response
    let upstream_status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| HealaError::RemoteCallFailure(format!("Failed to read Gemini body: {e}")))?;

    let status = StatusCode::from_u16(upstream_status).map_err(|e| {
        HealaError::RemoteCallFailure(format!("Invalid upstream status {upstream_status}: {e}"))
    })?;
    if !status.is_success() {
        warn!("Gemini answered with status {}", status);
    }

    Ok((status, [(CONTENT_TYPE, content_type)], bytes).into_response())
}

fn upstream_failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": UPSTREAM_FAILURE_MESSAGE })),
    )
        .into_response()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::LIVENESS_TEXT;
    use crate::testing::{serve_ephemeral, unused_addr};
    use crate::ServerConfig;
    use axum::extract::Query;
    use serde_json::Value;
    use std::collections::HashMap;

    async fn fake_generate(
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        Json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "lab" }] } }],
            "seenKey": query.get("key"),
            "echo": body,
        }))
    }

    async fn fake_quota() -> (StatusCode, Json<Value>) {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": { "code": 429, "message": "quota" } })),
        )
    }

    async fn start_relay(upstream_url: String) -> SocketAddr {
        let mut config = ServerConfig::new("test-key");
        config.upstream_url = upstream_url;
        config.upstream_timeout_secs = 5;
        config.listen_addr = "127.0.0.1:0".to_string();
        let state = Arc::new(AppState::new(config).expect("state"));
        spawn_relay_server(state).await.expect("relay")
    }

    async fn start_upstream() -> SocketAddr {
        serve_ephemeral(
            Router::new()
                .route("/generate", post(fake_generate))
                .route("/quota", post(fake_quota)),
        )
        .await
    }

    #[tokio::test]
    async fn test_forwards_body_and_key() {
        let upstream = start_upstream().await;
        let relay = start_relay(format!("http://{upstream}/generate")).await;

        let request = json!({ "contents": [{ "parts": [{ "text": "hello" }] }] });
        let response = reqwest::Client::new()
            .post(format!("http://{relay}/analyze"))
            .json(&request)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["seenKey"], "test-key");
        assert_eq!(body["echo"], request);
        assert_eq!(body["candidates"][0]["content"]["parts"][0]["text"], "lab");
    }

    #[tokio::test]
    async fn test_passes_upstream_status_through() {
        let upstream = start_upstream().await;
        let relay = start_relay(format!("http://{upstream}/quota")).await;

        let response = reqwest::Client::new()
            .post(format!("http://{relay}/analyze"))
            .json(&json!({ "contents": [] }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 429);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["message"], "quota");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_returns_fixed_error() {
        let dead = unused_addr().await;
        let relay = start_relay(format!("http://{dead}/generate")).await;

        let response = reqwest::Client::new()
            .post(format!("http://{relay}/analyze"))
            .json(&json!({ "contents": [] }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Failed to contact Gemini API" }));
    }

    #[tokio::test]
    async fn test_liveness_and_ping() {
        let relay = start_relay("http://127.0.0.1:9/unused".to_string()).await;
        let client = reqwest::Client::new();

        let text = client
            .get(format!("http://{relay}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(text, LIVENESS_TEXT);

        let ping: Value = client
            .get(format!("http://{relay}/health_check"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ping["message"], "pong");
    }

    #[cfg(feature = "health-assistant")]
    #[tokio::test]
    async fn test_client_through_relay() {
        use crate::app::{GeminiClient, GeminiConfig, GenerateContentRequest, GenerativeModel};

        let upstream = start_upstream().await;
        let relay = start_relay(format!("http://{upstream}/generate")).await;
        let client = GeminiClient::new(GeminiConfig::relay(&format!("http://{relay}"))).unwrap();

        let text = client
            .generate(&GenerateContentRequest::text("classify"))
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("lab"));
    }

    #[tokio::test]
    async fn test_rejects_non_json_body() {
        let relay = start_relay("http://127.0.0.1:9/unused".to_string()).await;
        let response = reqwest::Client::new()
            .post(format!("http://{relay}/analyze"))
            .header("content-type", "application/json")
            .body("not json")
            .send()
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
