// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Notion sync: mirror Strava activities into a Notion database.
//!
//! A background poller fetches the latest activities on a fixed interval
//! and inserts the ones Notion does not have yet. Quick and full-history
//! syncs can be triggered manually through the HTTP control API, which also
//! hosts the Strava OAuth callback.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{EventBacklog, PollingCoordinator};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub coordinator: PollingCoordinator,
    pub events: EventBacklog,
    /// Builds the Strava consent URL
    pub strava_client: services::StravaClient,
}
