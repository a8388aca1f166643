// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is loaded first if present. The
//! same file is where refreshed Strava tokens are written back (see
//! [`crate::db::TokenStore`]).

use regex::Regex;
use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

static RE_NOTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9a-fA-F]{32}").expect("valid regex"));

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Long-lived Strava refresh token, if the app was already authorized
    pub strava_refresh_token: Option<String>,
    /// Last known Strava access token
    pub strava_access_token: Option<String>,
    /// Notion integration token
    pub notion_token: String,
    /// Notion database URL or id, parsed lazily by [`NotionDatabaseId::parse`]
    pub notion_database_url: String,
    /// Notion column names for each synced field
    pub mapping: FieldMapping,
    /// Server port (OAuth callback + control API)
    pub port: u16,
    /// Externally reachable base URL, used for the OAuth redirect URI
    pub public_url: String,
    /// Time between periodic polls
    pub poll_interval: Duration,
    /// File where refreshed tokens are persisted
    pub credentials_file: PathBuf,
    pub sync: SyncSettings,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match optional("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT", v))?,
            None => 5000,
        };
        let poll_interval = match optional("POLL_INTERVAL_MINUTES") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|m| *m > 0)
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid("POLL_INTERVAL_MINUTES", v))?,
            None => Duration::from_secs(15 * 60),
        };

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
            strava_refresh_token: optional("STRAVA_REFRESH_TOKEN"),
            strava_access_token: optional("STRAVA_ACCESS_TOKEN"),
            notion_token: required("NOTION_TOKEN")?,
            notion_database_url: required("NOTION_DATABASE_URL")?,
            mapping: FieldMapping::from_lookup(&lookup)?,
            port,
            public_url: optional("PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            poll_interval,
            credentials_file: optional("CREDENTIALS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".env")),
            sync: SyncSettings::default(),
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_refresh_token: Some("test_refresh_token".to_string()),
            strava_access_token: None,
            notion_token: "secret_test_notion".to_string(),
            notion_database_url: "0123456789abcdef0123456789abcdef".to_string(),
            mapping: FieldMapping::default(),
            port: 5000,
            public_url: "http://localhost:5000".to_string(),
            poll_interval: Duration::from_secs(15 * 60),
            credentials_file: PathBuf::from(".env"),
            sync: SyncSettings::default(),
        }
    }

    /// Redirect URI registered with Strava for the OAuth callback.
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/auth/strava/callback", self.public_url)
    }
}

/// Notion column names for each semantic activity field.
///
/// An empty name disables the column: the field is left out of every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub title: String,
    /// Dedup key column, never empty
    pub strava_id: String,
    pub date: String,
    pub distance: String,
    pub duration: String,
    pub sport_type: String,
    pub elevation: String,
    pub calories: String,
    pub heart_rate: String,
    pub perceived_exertion: String,
    pub description: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            title: "Nom".to_string(),
            strava_id: "ID Strava".to_string(),
            date: "Date".to_string(),
            distance: "Distance (km)".to_string(),
            duration: "Durée (min)".to_string(),
            sport_type: "Sport".to_string(),
            elevation: "D+".to_string(),
            calories: "Calories".to_string(),
            heart_rate: "FC Moy".to_string(),
            perceived_exertion: "EP".to_string(),
            description: "Notes".to_string(),
        }
    }
}

impl FieldMapping {
    /// Read `MAP_*` keys; unset keys keep the default column name.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let column = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .unwrap_or(default)
        };

        let mapping = Self {
            title: column("MAP_TITLE", defaults.title),
            strava_id: column("MAP_STRAVA_ID", defaults.strava_id),
            date: column("MAP_DATE", defaults.date),
            distance: column("MAP_DISTANCE", defaults.distance),
            duration: column("MAP_DURATION", defaults.duration),
            sport_type: column("MAP_TYPE", defaults.sport_type),
            elevation: column("MAP_ELEVATION", defaults.elevation),
            calories: column("MAP_CALORIES", defaults.calories),
            heart_rate: column("MAP_HEART_RATE", defaults.heart_rate),
            perceived_exertion: column("MAP_PERCEIVED_EXERTION", defaults.perceived_exertion),
            description: column("MAP_DESCRIPTION", defaults.description),
        };

        if mapping.strava_id.is_empty() {
            return Err(ConfigError::Missing("MAP_STRAVA_ID"));
        }
        Ok(mapping)
    }
}

/// Tunables for a single sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Activities requested by the periodic and quick syncs
    pub recent_limit: u32,
    /// Page size for the full-history sync (Strava maximum is 200)
    pub page_size: u32,
    /// Pause between history pages to stay under Strava's rate limit
    pub page_delay: Duration,
    /// Retries after a 429 before pagination gives up
    pub rate_limit_retries: usize,
    /// First backoff delay after a 429; doubles on each retry
    pub rate_limit_backoff: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            recent_limit: 10,
            page_size: 200,
            page_delay: Duration::from_millis(500),
            rate_limit_retries: 3,
            rate_limit_backoff: Duration::from_secs(15),
        }
    }
}

/// Notion database id in canonical 8-4-4-4-12 form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionDatabaseId(String);

impl NotionDatabaseId {
    /// Extract the database id from a Notion URL or a bare id, with or
    /// without hyphens.
    pub fn parse(url_or_id: &str) -> Result<Self, ConfigError> {
        let raw = match RE_NOTION_ID.find(url_or_id) {
            Some(m) => m.as_str().to_string(),
            None => url_or_id.trim().replace('-', ""),
        };

        uuid::Uuid::try_parse(&raw)
            .map(|id| Self(id.hyphenated().to_string()))
            .map_err(|_| ConfigError::InvalidDatabaseId(url_or_id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NotionDatabaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Notion database id {0:?} is not a valid id (expected 32 hex digits, 8-4-4-4-12)")]
    InvalidDatabaseId(String),
}
