// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - sync pipeline and API clients.

pub mod events;
pub mod notion;
pub mod poller;
pub mod sink;
pub mod strava;
pub mod sync;
pub mod token_guard;

pub use events::{EventBacklog, EventLevel, EventLog, EventStream, SyncEvent};
pub use notion::{FieldSet, FieldValue, NotionClient, RecordSink, WriteReceipt};
pub use poller::PollingCoordinator;
pub use sink::SinkGateway;
pub use strava::{ActivitySource, StravaClient, TokenGrant};
pub use sync::SyncRun;
pub use token_guard::{BearerToken, TokenGuard};
