// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const LIVENESS_TEXT: &str = "Server is running";

/// Response for the health check endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}

/// Plain-text liveness string served on `/`.
pub async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

/// Simple ping handler
pub async fn health_check() -> Json<PingResponse> {
    debug!("Health check ping received");
    Json(PingResponse {
        message: "pong".to_string(),
    })
}
