// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event stream for sync progress, consumed by the control surface.
//!
//! Every event is also emitted through `tracing`, so nothing is lost when
//! no consumer is attached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

/// A timestamped, human-readable sync event.
#[derive(Debug, Clone, Serialize)]
pub struct SyncEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub message: String,
}

/// Producer side of the event stream. Cheap to clone.
#[derive(Clone)]
pub struct EventLog {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

/// Consumer side of the event stream. There is exactly one per [`EventLog`].
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl EventLog {
    pub fn new() -> (Self, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, EventStream { rx })
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.push(EventLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.push(EventLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.push(EventLevel::Error, message);
    }

    fn push(&self, level: EventLevel, message: String) {
        // Receiver gone: the tracing line above is all we can do.
        let _ = self.tx.send(SyncEvent {
            timestamp: Utc::now(),
            level,
            message,
        });
    }
}

impl EventStream {
    /// Next event, or `None` once every [`EventLog`] handle is dropped.
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<SyncEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued so far.
    pub fn drain(&mut self) -> Vec<SyncEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// The most recent events, for clients that poll instead of streaming.
#[derive(Clone)]
pub struct EventBacklog {
    events: Arc<Mutex<VecDeque<SyncEvent>>>,
    capacity: usize,
}

impl EventBacklog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, event: SyncEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Consume `stream` into this backlog until every producer is gone.
    pub fn collect_from(&self, mut stream: EventStream) -> JoinHandle<()> {
        let backlog = self.clone();
        tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                backlog.push(event);
            }
        })
    }
}
