// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching activities and managing OAuth tokens.
//!
//! Handles:
//! - Latest-activities and paginated history fetching
//! - Authorization code exchange and token refresh
//! - Rate limit detection (429 -> [`SyncError::RateLimited`])

use crate::error::SyncError;
use crate::models::ActivityRecord;
use async_trait::async_trait;
use serde::Deserialize;

const STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
const STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth";

/// Capabilities the sync pipeline needs from the activity source.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Most recent `limit` activities, newest first.
    async fn fetch_recent(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<ActivityRecord>, SyncError>;

    /// One page of the activity history. An empty page means the end.
    async fn fetch_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivityRecord>, SyncError>;

    /// A single detailed activity.
    async fn fetch_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<ActivityRecord, SyncError>;

    /// Exchange a one-time authorization code for a token pair.
    async fn exchange_authorization_code(&self, code: &str) -> Result<TokenGrant, SyncError>;

    /// Obtain a new access token. Strava may rotate the refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, SyncError>;
}

/// Token endpoint response (both grant types).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_base_urls(client_id, client_secret, STRAVA_API_URL, STRAVA_OAUTH_URL)
    }

    /// Client pointed at alternate API/OAuth roots (used by tests).
    pub fn with_base_urls(
        client_id: String,
        client_secret: String,
        base_url: &str,
        oauth_url: &str,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    /// URL the user visits to grant read access to their activities.
    pub fn authorize_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope=activity:read_all",
            self.oauth_url,
            self.client_id,
            urlencoding::encode(redirect_uri)
        )
    }

    /// List activities (paginated, newest first).
    async fn list_activities(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivityRecord>, SyncError> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("page", page.to_string()), ("per_page", per_page.to_string())])
            .send()
            .await
            .map_err(|e| SyncError::SourceFetch(e.to_string()))?;

        check_response_json(response).await
    }

    /// POST to the token endpoint with the given grant.
    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<reqwest::Response, SyncError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        self.http
            .post(format!("{}/token", self.oauth_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| SyncError::SourceFetch(format!("Token request failed: {}", e)))
    }
}

#[async_trait]
impl ActivitySource for StravaClient {
    async fn fetch_recent(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<ActivityRecord>, SyncError> {
        self.list_activities(access_token, 1, limit).await
    }

    async fn fetch_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivityRecord>, SyncError> {
        self.list_activities(access_token, page, per_page).await
    }

    async fn fetch_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<ActivityRecord, SyncError> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::SourceFetch(e.to_string()))?;

        check_response_json(response).await
    }

    async fn exchange_authorization_code(&self, code: &str) -> Result<TokenGrant, SyncError> {
        let response = self
            .token_request(&[("code", code), ("grant_type", "authorization_code")])
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token exchange failed");
            return Err(SyncError::AuthExchange {
                status: status.as_u16(),
                body,
            });
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| SyncError::SourceFetch(format!("Failed to parse token response: {}", e)))?;

        if grant.refresh_token.is_none() {
            return Err(SyncError::AuthExchange {
                status: 200,
                body: "response did not include a refresh token".to_string(),
            });
        }
        Ok(grant)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, SyncError> {
        let response = self
            .token_request(&[
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token refresh failed");
            return Err(SyncError::TokenRefresh {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::SourceFetch(format!("Failed to parse token response: {}", e)))
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, SyncError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Strava rate limit hit (429)");
            return Err(SyncError::RateLimited("Strava"));
        }

        return Err(SyncError::SourceFetch(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| SyncError::SourceFetch(format!("JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let client = StravaClient::new("4242".to_string(), "s".to_string());
        let url = client.authorize_url("http://localhost:5000/auth/strava/callback");

        assert_eq!(
            url,
            "https://www.strava.com/oauth/authorize?client_id=4242&response_type=code\
             &redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fstrava%2Fcallback\
             &scope=activity:read_all"
        );
    }

    #[test]
    fn test_token_grant_without_rotation() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token": "a", "expires_at": 1700000000}"#).unwrap();
        assert_eq!(grant.access_token, "a");
        assert_eq!(grant.refresh_token, None);
    }
}
