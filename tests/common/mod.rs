// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fakes for the Strava and Notion APIs.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strava_notion_sync::config::{Config, FieldMapping, NotionDatabaseId, SyncSettings};
use strava_notion_sync::db::TokenStore;
use strava_notion_sync::error::SyncError;
use strava_notion_sync::models::ActivityRecord;
use strava_notion_sync::routes::create_router;
use strava_notion_sync::services::{
    ActivitySource, EventBacklog, EventLog, EventStream, FieldSet, FieldValue, PollingCoordinator,
    RecordSink, StravaClient, TokenGrant, WriteReceipt,
};
use strava_notion_sync::AppState;

/// Build an activity with only the id and a few basics set.
#[allow(dead_code)]
pub fn activity(id: u64) -> ActivityRecord {
    ActivityRecord {
        id,
        name: Some(format!("Activity {}", id)),
        start_date_local: "2025-05-01T08:00:00Z".to_string(),
        distance: 12000.0,
        moving_time: 3600,
        activity_type: Some("Ride".to_string()),
        total_elevation_gain: Some(100.0),
        calories: None,
        average_heartrate: None,
        perceived_exertion: None,
        description: None,
    }
}

/// Fake Strava: serves a fixed activity list, newest first.
#[derive(Default)]
pub struct FakeSource {
    pub activities: Mutex<Vec<ActivityRecord>>,
    pub recent_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// Page number that fails with a transport error
    pub failing_page: Mutex<Option<u32>>,
    /// Number of upcoming list calls answered with 429
    pub rate_limited_calls: AtomicUsize,
    /// Refresh token handed out on the next refresh
    pub rotate_refresh_to: Mutex<Option<String>>,
    /// How long each latest-activities request takes
    pub recent_delay: Mutex<Option<Duration>>,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn with_activities(ids: impl IntoIterator<Item = u64>) -> Arc<Self> {
        let source = Self::default();
        *source.activities.lock().unwrap() = ids.into_iter().map(activity).collect();
        Arc::new(source)
    }

    fn take_rate_limit(&self) -> bool {
        self.rate_limited_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ActivitySource for FakeSource {
    async fn fetch_recent(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<ActivityRecord>, SyncError> {
        assert!(!access_token.is_empty());
        self.recent_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.recent_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.take_rate_limit() {
            return Err(SyncError::RateLimited("Strava"));
        }
        let activities = self.activities.lock().unwrap();
        Ok(activities.iter().take(limit as usize).cloned().collect())
    }

    async fn fetch_page(
        &self,
        _access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivityRecord>, SyncError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_rate_limit() {
            return Err(SyncError::RateLimited("Strava"));
        }
        if *self.failing_page.lock().unwrap() == Some(page) {
            return Err(SyncError::SourceFetch("connection reset".to_string()));
        }
        let activities = self.activities.lock().unwrap();
        let start = ((page - 1) * per_page) as usize;
        Ok(activities
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn fetch_activity(
        &self,
        _access_token: &str,
        activity_id: u64,
    ) -> Result<ActivityRecord, SyncError> {
        self.activities
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == activity_id)
            .cloned()
            .ok_or_else(|| SyncError::SourceFetch("HTTP 404 Not Found".to_string()))
    }

    async fn exchange_authorization_code(&self, code: &str) -> Result<TokenGrant, SyncError> {
        if code == "bad-code" {
            return Err(SyncError::AuthExchange {
                status: 400,
                body: r#"{"message":"Bad Request","errors":[{"field":"code"}]}"#.to_string(),
            });
        }
        Ok(TokenGrant {
            access_token: format!("access-from-{}", code),
            refresh_token: Some(format!("refresh-from-{}", code)),
            expires_at: Some(1_900_000_000),
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenGrant, SyncError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenGrant {
            access_token: format!("access-{}", n),
            refresh_token: self.rotate_refresh_to.lock().unwrap().clone(),
            expires_at: Some(1_900_000_000),
        })
    }
}

/// Fake Notion database keyed on the default dedup column.
#[derive(Default)]
pub struct FakeSink {
    pub existing: Mutex<HashSet<u64>>,
    pub written: Mutex<Vec<FieldSet>>,
    pub queries: AtomicUsize,
    pub inserts: AtomicUsize,
    /// Simulates an unshared or mistyped database (404 on query)
    pub database_missing: AtomicBool,
    /// Activity ids whose insert fails with HTTP 400
    pub rejected: Mutex<HashSet<u64>>,
}

#[allow(dead_code)]
impl FakeSink {
    pub fn with_existing(ids: impl IntoIterator<Item = u64>) -> Arc<Self> {
        let sink = Self::default();
        sink.existing.lock().unwrap().extend(ids);
        Arc::new(sink)
    }

    /// Activity ids inserted so far, in order.
    pub fn written_ids(&self) -> Vec<u64> {
        self.written.lock().unwrap().iter().filter_map(key_of).collect()
    }
}

fn key_of(fields: &FieldSet) -> Option<u64> {
    let key_column = FieldMapping::default().strava_id;
    fields.iter().find_map(|(column, value)| match value {
        FieldValue::Number(n) if *column == key_column => Some(*n as u64),
        _ => None,
    })
}

#[async_trait]
impl RecordSink for FakeSink {
    async fn query_by_key(
        &self,
        database_id: &NotionDatabaseId,
        key_field: &str,
        key: u64,
    ) -> Result<bool, SyncError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.database_missing.load(Ordering::SeqCst) {
            return Err(SyncError::SinkNotFound {
                database_id: database_id.to_string(),
            });
        }
        assert_eq!(key_field, FieldMapping::default().strava_id);
        Ok(self.existing.lock().unwrap().contains(&key))
    }

    async fn insert_record(
        &self,
        _database_id: &NotionDatabaseId,
        fields: &FieldSet,
    ) -> Result<WriteReceipt, SyncError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let key = key_of(fields).expect("dedup column present");
        if self.rejected.lock().unwrap().contains(&key) {
            return Err(SyncError::SinkWrite {
                status: 400,
                body: r#"{"code":"validation_error"}"#.to_string(),
            });
        }
        self.existing.lock().unwrap().insert(key);
        self.written.lock().unwrap().push(fields.clone());
        Ok(WriteReceipt {
            id: format!("page-{}", key),
            url: None,
        })
    }
}

/// Config with small pages and no real waiting.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        poll_interval: Duration::from_secs(60),
        sync: SyncSettings {
            recent_limit: 10,
            page_size: 5,
            page_delay: Duration::from_millis(10),
            rate_limit_retries: 3,
            rate_limit_backoff: Duration::from_millis(100),
        },
        ..Config::test_default()
    }
}

/// Coordinator wired to the given fakes.
#[allow(dead_code)]
pub fn test_coordinator(
    config: &Config,
    source: Arc<FakeSource>,
    sink: Arc<FakeSink>,
) -> (PollingCoordinator, EventStream) {
    let (events, stream) = EventLog::new();
    let coordinator =
        PollingCoordinator::new(config, source, sink, TokenStore::new_mock(), events);
    (coordinator, stream)
}

/// Router plus shared state, backed by the fakes.
#[allow(dead_code)]
pub fn create_test_app(
    source: Arc<FakeSource>,
    sink: Arc<FakeSink>,
) -> (axum::Router, Arc<AppState>) {
    let config = test_config();
    let (coordinator, stream) = test_coordinator(&config, source, sink);
    let events = EventBacklog::new(50);
    events.collect_from(stream);

    let state = Arc::new(AppState {
        strava_client: StravaClient::new(
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
        ),
        config,
        coordinator,
        events,
    });
    (create_router(state.clone()), state)
}
