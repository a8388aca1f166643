// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the sync pipeline and the HTTP control surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::ConfigError;

/// Failures raised while talking to Strava, Notion or the credential store.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Strava authorization code exchange failed (HTTP {status}): {body}")]
    AuthExchange { status: u16, body: String },

    #[error("Strava token refresh failed (HTTP {status}): {body}")]
    TokenRefresh { status: u16, body: String },

    #[error("Strava access token missing, authorize the application first")]
    MissingCredentials,

    #[error("Notion query failed: {0}")]
    SinkQuery(String),

    #[error(
        "Notion database {database_id} not found; check that it is shared with the integration \
         and that NOTION_DATABASE_URL is correct"
    )]
    SinkNotFound { database_id: String },

    #[error("Notion page creation failed (HTTP {status}): {body}")]
    SinkWrite { status: u16, body: String },

    #[error("Strava fetch failed: {0}")]
    SourceFetch(String),

    #[error("Rate limit hit (429) on {0}")]
    RateLimited(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to persist credentials: {0}")]
    Persist(String),
}

impl SyncError {
    /// Errors that point at a configuration defect rather than a transient
    /// failure. These need an operator, retrying will not help.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            SyncError::MissingCredentials | SyncError::SinkNotFound { .. } | SyncError::Config(_)
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SyncError::RateLimited(_))
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Sync(err @ SyncError::AuthExchange { .. }) => {
                tracing::error!(error = %err, "Authorization code exchange failed");
                (StatusCode::BAD_GATEWAY, "auth_exchange_failed", Some(err.to_string()))
            }
            AppError::Sync(err) if err.is_systemic() => (
                StatusCode::SERVICE_UNAVAILABLE,
                "configuration_error",
                Some(err.to_string()),
            ),
            AppError::Sync(err) => (StatusCode::BAD_GATEWAY, "upstream_error", Some(err.to_string())),
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
