// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Control API: scheduler status, event log and sync triggers.

use crate::models::SchedulerStatus;
use crate::services::SyncEvent;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/events", get(get_events))
        .route("/api/sync/now", post(sync_now))
        .route("/api/sync/history", post(sync_history))
        .route("/api/polling/start", post(start_polling))
        .route("/api/polling/stop", post(stop_polling))
}

#[derive(Serialize)]
pub struct TriggerResponse {
    pub accepted: bool,
    pub message: String,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.coordinator.status())
}

async fn get_events(State(state): State<Arc<AppState>>) -> Json<Vec<SyncEvent>> {
    Json(state.events.snapshot())
}

/// Quick sync of the latest activities. Returns before the sync runs.
async fn sync_now(State(state): State<Arc<AppState>>) -> (StatusCode, Json<TriggerResponse>) {
    // Detached: the outcome is reported through the event log.
    drop(state.coordinator.sync_now());
    accepted("Quick sync started")
}

/// Full-history catch-up. Returns before the sync runs.
async fn sync_history(State(state): State<Arc<AppState>>) -> (StatusCode, Json<TriggerResponse>) {
    drop(state.coordinator.sync_all_history());
    accepted("Historical sync started")
}

async fn start_polling(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    if !state.coordinator.start() {
        tracing::debug!("Polling already running");
    }
    Json(state.coordinator.status())
}

async fn stop_polling(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    state.coordinator.stop().await;
    Json(state.coordinator.status())
}

fn accepted(message: &str) -> (StatusCode, Json<TriggerResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            accepted: true,
            message: message.to_string(),
        }),
    )
}
