// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One synchronization pass: fetch from Strava, write what Notion lacks.
//!
//! Periodic and quick runs fetch only the latest activities. Historical runs
//! page through the whole history; a failure mid-way keeps whatever pages
//! were already fetched.

use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::models::{ActivityRecord, RecordError, SyncKind, SyncRunResult};
use crate::services::events::EventLog;
use crate::services::sink::SinkGateway;
use crate::services::strava::ActivitySource;
use crate::services::token_guard::{BearerToken, TokenGuard};
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;

/// Progress is reported every this many activities on large runs.
const PROGRESS_EVERY: usize = 50;

pub struct SyncRun<'a> {
    kind: SyncKind,
    source: &'a dyn ActivitySource,
    tokens: &'a TokenGuard,
    sink: &'a SinkGateway,
    events: &'a EventLog,
    settings: &'a SyncSettings,
}

impl<'a> SyncRun<'a> {
    pub fn new(
        kind: SyncKind,
        source: &'a dyn ActivitySource,
        tokens: &'a TokenGuard,
        sink: &'a SinkGateway,
        events: &'a EventLog,
        settings: &'a SyncSettings,
    ) -> Self {
        Self {
            kind,
            source,
            tokens,
            sink,
            events,
            settings,
        }
    }

    /// Run the pass. Per-activity failures are collected in the result;
    /// only run-level failures (credentials, bounded fetch, missing database)
    /// are returned as errors.
    pub async fn execute(self) -> Result<SyncRunResult, SyncError> {
        let bearer = self.tokens.authorized_header().await?;

        let records = if self.kind.is_exhaustive() {
            self.fetch_history(&bearer).await
        } else {
            self.fetch_recent(&bearer).await?
        };

        self.write_missing(records).await
    }

    async fn fetch_recent(&self, bearer: &BearerToken) -> Result<Vec<ActivityRecord>, SyncError> {
        let limit = self.settings.recent_limit;
        self.with_backoff("fetch latest activities", || {
            self.source.fetch_recent(bearer.token(), limit)
        })
        .await
    }

    /// Page through the full history until a short or empty page.
    async fn fetch_history(&self, bearer: &BearerToken) -> Vec<ActivityRecord> {
        let per_page = self.settings.page_size;
        let mut all = Vec::new();
        let mut page = 1;
        let mut pages_fetched = 0;

        self.events
            .info("Fetching full Strava history (paginated)...");

        loop {
            let batch = match self
                .with_backoff("fetch history page", || {
                    self.source.fetch_page(bearer.token(), page, per_page)
                })
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    self.events.error(format!(
                        "Strava history fetch failed on page {}: {}. Continuing with {} activities",
                        page,
                        e,
                        all.len()
                    ));
                    break;
                }
            };

            if batch.is_empty() {
                tracing::debug!(page, "Empty page, end of history");
                break;
            }

            let fetched = batch.len();
            pages_fetched += 1;
            all.extend(batch);
            tracing::info!(page, fetched, total = all.len(), "Fetched history page");

            if fetched < per_page as usize {
                break;
            }

            page += 1;
            tokio::time::sleep(self.settings.page_delay).await;
        }

        self.events.info(format!(
            "Strava history fetched: {} activities in {} page(s)",
            all.len(),
            pages_fetched
        ));
        all
    }

    async fn write_missing(&self, records: Vec<ActivityRecord>) -> Result<SyncRunResult, SyncError> {
        let mut result = SyncRunResult::new(self.kind);
        result.total_seen = records.len();

        if records.is_empty() {
            self.events
                .info(format!("No activities to check ({} sync)", self.kind));
            return Ok(result);
        }

        self.events.info(format!(
            "{} activities found ({} sync), checking Notion...",
            records.len(),
            self.kind
        ));

        for (i, record) in records.iter().enumerate() {
            if records.len() > 10 && i > 0 && i % PROGRESS_EVERY == 0 {
                self.events.info(format!(
                    "Progress ({} sync): {}/{} activities checked",
                    self.kind,
                    i,
                    records.len()
                ));
            }

            match self.sync_one(record).await {
                Ok(true) => result.total_written += 1,
                Ok(false) => {}
                Err(e @ SyncError::SinkNotFound { .. }) => return Err(e),
                Err(e) => {
                    self.events
                        .error(format!("Failed to sync activity {}: {}", record.id, e));
                    result.errors.push(RecordError {
                        record_id: record.id,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.events.info(format!(
            "{} sync finished: {} of {} activities added to Notion, {} failed",
            self.kind,
            result.total_written,
            result.total_seen,
            result.errors.len()
        ));
        Ok(result)
    }

    /// Check-then-insert for one activity. Returns whether it was written.
    async fn sync_one(&self, record: &ActivityRecord) -> Result<bool, SyncError> {
        let exists = self
            .with_backoff("query Notion", || self.sink.exists(record.id))
            .await?;
        if exists {
            return Ok(false);
        }

        self.with_backoff("write to Notion", || self.sink.write(record))
            .await?;
        Ok(true)
    }

    /// Retry `op` with exponential backoff while it reports a rate limit.
    async fn with_backoff<T, F, Fut>(&self, what: &str, op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let policy = ExponentialBuilder::default()
            .with_min_delay(self.settings.rate_limit_backoff)
            .with_max_times(self.settings.rate_limit_retries);

        op.retry(policy)
            .when(SyncError::is_rate_limited)
            .notify(|err, wait| {
                self.events.warn(format!(
                    "{} while trying to {}, retrying in {}s",
                    err,
                    what,
                    wait.as_secs()
                ));
            })
            .await
    }
}
