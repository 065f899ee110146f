// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use heala_server::relay::spawn_relay_server;
use heala_server::{AppState, ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already carry the key.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,heala_server=debug")),
        )
        .init();

    let config = ServerConfig::load().context("failed to load relay configuration")?;
    info!(
        "Relaying to {} (body limit {} bytes)",
        config.upstream_url, config.body_limit_bytes
    );

    let state = Arc::new(AppState::new(config).context("failed to initialise relay state")?);
    let addr = spawn_relay_server(state)
        .await
        .context("failed to start relay")?;
    info!("Backend running on {}", addr);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");

    Ok(())
}
