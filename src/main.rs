// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify Wrapped API Server
//!
//! Connects a user's Spotify account and keeps point-in-time snapshots of
//! their top tracks and artists.

use spotify_wrapped::{
    clock::default_clock,
    config::Config,
    db::{FirestoreDb, MemoryWrapRepository, WrapRepository},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Spotify Wrapped API");

    // Wrap storage: Firestore when a project is configured, memory otherwise
    let clock = default_clock();
    let wraps: Arc<dyn WrapRepository> = match &config.gcp_project_id {
        Some(project_id) => Arc::new(
            FirestoreDb::new(project_id)
                .await?
                .with_clock(clock.clone()),
        ),
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, wraps are kept in memory only");
            Arc::new(MemoryWrapRepository::with_clock(clock.clone()))
        }
    };

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::new(config, wraps, clock)?);

    // Build router
    let app = spotify_wrapped::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spotify_wrapped=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
