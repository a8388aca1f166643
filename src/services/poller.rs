// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Polling coordinator: periodic sync loop plus manual triggers.
//!
//! One background task runs the periodic loop while the coordinator is
//! started. Manual "sync now" and "full history" requests each get their own
//! task and run regardless of the loop state. Runs are not serialized against
//! each other; the exists-before-write check is the only dedup guard.

use crate::config::{Config, FieldMapping, NotionDatabaseId, SyncSettings};
use crate::db::TokenStore;
use crate::error::SyncError;
use crate::models::{Credentials, SchedulerStatus, SyncKind, SyncRunResult};
use crate::services::events::EventLog;
use crate::services::notion::RecordSink;
use crate::services::sink::SinkGateway;
use crate::services::strava::ActivitySource;
use crate::services::sync::SyncRun;
use crate::services::token_guard::TokenGuard;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long `stop()` waits for the loop to wind down.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the sync scheduler. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct PollingCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    tokens: TokenGuard,
    source: Arc<dyn ActivitySource>,
    sink_client: Arc<dyn RecordSink>,
    database_url: String,
    mapping: FieldMapping,
    /// Built on first use so a bad database id is reported per run.
    sink: RwLock<Option<Arc<SinkGateway>>>,
    events: EventLog,
    settings: SyncSettings,
    interval: Duration,

    last_check: Mutex<Option<DateTime<Utc>>>,
    next_check: Mutex<Option<DateTime<Utc>>>,
    alert: Mutex<Option<String>>,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    records_written: AtomicU64,

    /// Present exactly while the coordinator is running.
    worker: Mutex<Option<Worker>>,
}

/// The periodic loop task and its stop signal.
struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Lock a std mutex, recovering the data if a panicking task poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PollingCoordinator {
    pub fn new(
        config: &Config,
        source: Arc<dyn ActivitySource>,
        sink_client: Arc<dyn RecordSink>,
        store: TokenStore,
        events: EventLog,
    ) -> Self {
        let credentials = Credentials::new(
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
            config.strava_refresh_token.clone(),
            config.strava_access_token.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                tokens: TokenGuard::new(source.clone(), credentials, store),
                source,
                sink_client,
                database_url: config.notion_database_url.clone(),
                mapping: config.mapping.clone(),
                sink: RwLock::new(None),
                events,
                settings: config.sync.clone(),
                interval: config.poll_interval,
                last_check: Mutex::new(None),
                next_check: Mutex::new(None),
                alert: Mutex::new(None),
                runs_completed: AtomicU64::new(0),
                runs_failed: AtomicU64::new(0),
                records_written: AtomicU64::new(0),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn token_guard(&self) -> &TokenGuard {
        &self.inner.tokens
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.worker).is_some()
    }

    /// Launch the periodic loop. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut worker = lock(&self.inner.worker);
        if worker.is_some() {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(self.inner.clone(), stop_rx));
        *worker = Some(Worker { stop_tx, handle });

        *lock(&self.inner.last_check) = Some(Utc::now());
        self.inner.events.info(format!(
            "Polling service started (every {}s)",
            self.inner.interval.as_secs()
        ));
        true
    }

    /// Signal the loop to exit and wait briefly for it. No-op when stopped.
    ///
    /// Manual syncs already in flight are not affected.
    pub async fn stop(&self) {
        let Some(worker) = lock(&self.inner.worker).take() else {
            return;
        };

        self.inner
            .events
            .info("Stop signal sent to the polling loop");
        let _ = worker.stop_tx.send(true);

        if tokio::time::timeout(STOP_TIMEOUT, worker.handle)
            .await
            .is_err()
        {
            self.inner
                .events
                .warn("Polling loop still busy after stop; it will exit after its current cycle");
        }

        // A start() during the wait above installs a new worker; leave its
        // schedule alone.
        {
            let worker = lock(&self.inner.worker);
            if worker.is_none() {
                *lock(&self.inner.next_check) = None;
            }
        }
        self.inner.events.info("Polling service stopped");
    }

    /// Quick sync of the latest activities, in the background.
    pub fn sync_now(&self) -> JoinHandle<Option<SyncRunResult>> {
        self.spawn_manual(SyncKind::Quick)
    }

    /// Full-history catch-up, in the background.
    pub fn sync_all_history(&self) -> JoinHandle<Option<SyncRunResult>> {
        self.spawn_manual(SyncKind::Historical)
    }

    fn spawn_manual(&self, kind: SyncKind) -> JoinHandle<Option<SyncRunResult>> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner
                .events
                .info(format!("--- Manual {} sync started ---", kind));
            inner.run_sync(kind).await
        })
    }

    /// Complete the OAuth flow with the code Strava redirected back with.
    pub async fn exchange_code(&self, code: &str) -> Result<String, SyncError> {
        let refresh_token = match self.inner.tokens.exchange_code(code).await {
            Ok(token) => token,
            Err(e) => {
                self.inner
                    .events
                    .error(format!("Strava authorization failed: {}", e));
                return Err(e);
            }
        };
        self.inner
            .events
            .info("Strava authorization succeeded, refresh token saved");

        // Confirms the new refresh token is usable right away.
        if let Err(e) = self.inner.tokens.refresh_access_token().await {
            self.inner.events.warn(format!(
                "Initial token refresh after authorization failed: {}",
                e
            ));
        }

        lock(&self.inner.alert).take();
        Ok(refresh_token)
    }

    pub fn status(&self) -> SchedulerStatus {
        let inner = &self.inner;
        let running = self.is_running();
        SchedulerStatus {
            running,
            last_check_time: *lock(&inner.last_check),
            next_check_time: *lock(&inner.next_check),
            interval_seconds: inner.interval.as_secs(),
            runs_completed: inner.runs_completed.load(Ordering::Relaxed),
            runs_failed: inner.runs_failed.load(Ordering::Relaxed),
            records_written: inner.records_written.load(Ordering::Relaxed),
            alert: lock(&inner.alert).clone(),
        }
    }
}

impl Inner {
    /// Run one sync of `kind`, recording the outcome. Never fails.
    async fn run_sync(&self, kind: SyncKind) -> Option<SyncRunResult> {
        match self.try_run(kind).await {
            Ok(result) => {
                *lock(&self.last_check) = Some(Utc::now());
                lock(&self.alert).take();
                self.runs_completed.fetch_add(1, Ordering::Relaxed);
                self.records_written
                    .fetch_add(result.total_written as u64, Ordering::Relaxed);
                self.events
                    .info(format!("--- {} sync completed ---", kind));
                Some(result)
            }
            Err(e) => {
                self.runs_failed.fetch_add(1, Ordering::Relaxed);
                if e.is_systemic() {
                    *lock(&self.alert) = Some(e.to_string());
                    self.events
                        .error(format!("ACTION REQUIRED ({} sync aborted): {}", kind, e));
                } else {
                    self.events
                        .error(format!("{} sync aborted: {}", kind, e));
                }
                None
            }
        }
    }

    async fn try_run(&self, kind: SyncKind) -> Result<SyncRunResult, SyncError> {
        if self.tokens.refresh_access_token().await?.is_none() {
            self.events.warn(
                "No Strava refresh token yet; authorize the application via /auth/strava",
            );
        }

        let sink = self.ensure_sink()?;

        SyncRun::new(
            kind,
            self.source.as_ref(),
            &self.tokens,
            &sink,
            &self.events,
            &self.settings,
        )
        .execute()
        .await
    }

    fn ensure_sink(&self) -> Result<Arc<SinkGateway>, SyncError> {
        if let Some(sink) = self
            .sink
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            return Ok(sink.clone());
        }

        let database_id = NotionDatabaseId::parse(&self.database_url)?;
        self.events
            .info(format!("Notion client ready for database {}", database_id));

        let sink = Arc::new(SinkGateway::new(
            self.sink_client.clone(),
            database_id,
            self.mapping.clone(),
        ));
        *self
            .sink
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(sink.clone());
        Ok(sink)
    }
}

/// Periodic loop: sync, then wait for the interval or a stop signal.
async fn run_loop(inner: Arc<Inner>, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        // Own task per cycle so a panic is contained like any other failure.
        let cycle = tokio::spawn({
            let inner = inner.clone();
            async move {
                inner.events.info("--- Polling cycle started ---");
                inner.run_sync(SyncKind::Periodic).await;
            }
        });
        if let Err(e) = cycle.await {
            inner.runs_failed.fetch_add(1, Ordering::Relaxed);
            inner
                .events
                .error(format!("Polling cycle crashed: {}", e));
        }

        // Stopped mid-cycle: the schedule belongs to whoever runs next.
        if *stop_rx.borrow() {
            break;
        }

        let next = chrono::Duration::from_std(inner.interval)
            .ok()
            .map(|d| Utc::now() + d);
        *lock(&inner.next_check) = next;

        tokio::select! {
            _ = tokio::time::sleep(inner.interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Polling loop exited");
}
