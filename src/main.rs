// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Notion sync server
//!
//! Runs the periodic Strava poller and serves the OAuth callback and the
//! control API on one port.

use anyhow::Context;
use std::sync::Arc;
use strava_notion_sync::{
    config::Config,
    db::TokenStore,
    services::{EventBacklog, EventLog, NotionClient, PollingCoordinator, StravaClient},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Events kept for `GET /api/events`.
const EVENT_BACKLOG: usize = 200;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        interval_secs = config.poll_interval.as_secs(),
        "Starting Strava-Notion sync"
    );

    let strava_client = StravaClient::new(
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
    );
    let notion_client = NotionClient::new(config.notion_token.clone());
    let store = TokenStore::new(config.credentials_file.clone());

    let (events, stream) = EventLog::new();
    let backlog = EventBacklog::new(EVENT_BACKLOG);
    backlog.collect_from(stream);

    let coordinator = PollingCoordinator::new(
        &config,
        Arc::new(strava_client.clone()),
        Arc::new(notion_client),
        store,
        events,
    );

    if config.strava_refresh_token.is_some() {
        coordinator.start();
    } else {
        tracing::warn!(
            url = %format!("{}/auth/strava", config.public_url),
            "No Strava refresh token configured; authorize first, then start polling"
        );
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        coordinator: coordinator.clone(),
        events: backlog,
        strava_client,
    });

    let app = strava_notion_sync::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("strava_notion_sync=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
