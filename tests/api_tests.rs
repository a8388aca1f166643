// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Control API and OAuth callback tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

mod common;
use common::{create_test_app, FakeSink, FakeSource};

async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let (app, _state) = create_test_app(FakeSource::with_activities([]), Arc::new(FakeSink::default()));

    let (status, body) = send(app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_status_reports_stopped_scheduler() {
    let (app, _state) = create_test_app(FakeSource::with_activities([]), Arc::new(FakeSink::default()));

    let (status, body) = send(app, "GET", "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
    assert_eq!(body["interval_seconds"], 60);
    assert!(body["next_check_time"].is_null());
    assert!(body["alert"].is_null());
}

#[tokio::test]
async fn test_sync_now_is_accepted_and_runs_in_background() {
    let source = FakeSource::with_activities([1, 2]);
    let sink = Arc::new(FakeSink::default());
    let (app, state) = create_test_app(source, sink.clone());

    let (status, body) = send(app, "POST", "/api/sync/now").await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], true);

    for _ in 0..100 {
        if state.coordinator.status().runs_completed == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(sink.written_ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_sync_history_is_accepted() {
    let (app, _state) =
        create_test_app(FakeSource::with_activities([1]), Arc::new(FakeSink::default()));

    let (status, body) = send(app, "POST", "/api/sync/history").await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Historical sync started");
}

#[tokio::test]
async fn test_polling_start_and_stop() {
    let (app, state) =
        create_test_app(FakeSource::with_activities([]), Arc::new(FakeSink::default()));

    let (status, body) = send(app.clone(), "POST", "/api/polling/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], true);
    assert!(state.coordinator.is_running());

    let (status, body) = send(app, "POST", "/api/polling/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
}

#[tokio::test]
async fn test_auth_start_redirects_to_strava() {
    let (app, _state) =
        create_test_app(FakeSource::with_activities([]), Arc::new(FakeSink::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/strava")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://www.strava.com/oauth/authorize?client_id=test_client_id"));
    assert!(location.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fstrava%2Fcallback"));
    assert!(location.contains("scope=activity:read_all"));
}

#[tokio::test]
async fn test_callback_without_code() {
    let (app, _state) =
        create_test_app(FakeSource::with_activities([]), Arc::new(FakeSink::default()));

    let (status, body) = send(app, "GET", "/auth/strava/callback").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_callback_with_denied_consent() {
    let (app, _state) =
        create_test_app(FakeSource::with_activities([]), Arc::new(FakeSink::default()));

    let (status, body) = send(app, "GET", "/auth/strava/callback?error=access_denied").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("access_denied"));
}

#[tokio::test]
async fn test_callback_exchanges_code() {
    let source = FakeSource::with_activities([]);
    let (app, state) = create_test_app(source.clone(), Arc::new(FakeSink::default()));

    let (status, _body) = send(app, "GET", "/auth/strava/callback?code=abc123").await;

    assert_eq!(status, StatusCode::OK);
    let saved = state.coordinator.token_guard().store().last_saved().unwrap();
    assert_eq!(saved.refresh_token, "refresh-from-abc123");
    assert_eq!(source.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_callback_with_rejected_code() {
    let (app, state) =
        create_test_app(FakeSource::with_activities([]), Arc::new(FakeSink::default()));

    let (status, body) = send(app, "GET", "/auth/strava/callback?code=bad-code").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "auth_exchange_failed");
    assert!(body["details"].as_str().unwrap().contains("HTTP 400"));
    assert!(state.coordinator.token_guard().store().last_saved().is_none());
}

#[tokio::test]
async fn test_events_lists_recent_activity() {
    let (app, state) =
        create_test_app(FakeSource::with_activities([1]), Arc::new(FakeSink::default()));

    state.coordinator.sync_now().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let (status, body) = send(app, "GET", "/api/events").await;

    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert!(!events.is_empty());
    assert!(events
        .iter()
        .any(|e| e["message"] == "--- Manual quick sync started ---"));
    assert!(events.iter().all(|e| e["level"].is_string()));
}
