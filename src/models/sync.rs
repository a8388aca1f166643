// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sync run results and scheduler status.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// What triggered a sync run and how much it fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Scheduled poll, latest activities only
    Periodic,
    /// Manual "sync now", latest activities only
    Quick,
    /// Manual full-history catch-up
    Historical,
}

impl SyncKind {
    /// Whether this run pages through the whole activity history.
    pub fn is_exhaustive(self) -> bool {
        matches!(self, SyncKind::Historical)
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncKind::Periodic => "periodic",
            SyncKind::Quick => "quick",
            SyncKind::Historical => "historical",
        };
        f.write_str(label)
    }
}

/// A single activity that could not be checked or written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    pub record_id: u64,
    pub message: String,
}

/// Outcome of one sync run. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRunResult {
    pub kind: SyncKind,
    pub total_seen: usize,
    pub total_written: usize,
    /// In processing order
    pub errors: Vec<RecordError>,
}

impl SyncRunResult {
    pub fn new(kind: SyncKind) -> Self {
        Self {
            kind,
            total_seen: 0,
            total_written: 0,
            errors: Vec::new(),
        }
    }
}

/// Scheduler status exposed to the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_check_time: Option<DateTime<Utc>>,
    pub next_check_time: Option<DateTime<Utc>>,
    pub interval_seconds: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub records_written: u64,
    /// Last configuration problem that needs operator action
    pub alert: Option<String>,
}
