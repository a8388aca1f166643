// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth token lifecycle.
//!
//! The refresh token is the durable identity; the access token is derived
//! from it on demand. Every successful change to either token is written to
//! the [`TokenStore`] before the call returns, so a refreshed (and possibly
//! rotated) refresh token survives a crash right after.

use crate::db::TokenStore;
use crate::error::SyncError;
use crate::models::{Credentials, TokenKind};
use crate::services::strava::ActivitySource;
use std::fmt;
use std::sync::Arc;

/// Access token ready to be sent as a bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Owns the Strava credentials and keeps them fresh and persisted.
pub struct TokenGuard {
    source: Arc<dyn ActivitySource>,
    credentials: Credentials,
    store: TokenStore,
}

impl TokenGuard {
    pub fn new(source: Arc<dyn ActivitySource>, credentials: Credentials, store: TokenStore) -> Self {
        Self {
            source,
            credentials,
            store,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// Both tokens are persisted before they are adopted in memory; if the
    /// write fails the exchange is reported as failed.
    pub async fn exchange_code(&self, code: &str) -> Result<String, SyncError> {
        let grant = self.source.exchange_authorization_code(code).await?;
        let refresh_token = grant.refresh_token.ok_or_else(|| SyncError::AuthExchange {
            status: 200,
            body: "response did not include a refresh token".to_string(),
        })?;

        self.store
            .save_tokens(&grant.access_token, &refresh_token)
            .await?;

        self.credentials
            .set(TokenKind::Refresh, refresh_token.clone());
        self.credentials.set(TokenKind::Access, grant.access_token);

        tracing::info!("Strava authorization code exchanged, tokens stored");
        Ok(refresh_token)
    }

    /// Refresh the access token.
    ///
    /// Returns `Ok(None)` without any network call when no refresh token is
    /// held yet; that is an expected state before the first authorization.
    pub async fn refresh_access_token(&self) -> Result<Option<String>, SyncError> {
        let Some(refresh_token) = self.credentials.get(TokenKind::Refresh) else {
            tracing::warn!("Strava refresh token missing, cannot refresh access token");
            return Ok(None);
        };

        let grant = self.source.refresh_token(&refresh_token).await?;

        // Strava may hand out a new refresh token; the old one stops working.
        let current_refresh = match grant.refresh_token {
            Some(rotated) if rotated != refresh_token => {
                tracing::info!("Strava rotated the refresh token");
                self.credentials.set(TokenKind::Refresh, rotated.clone());
                rotated
            }
            _ => refresh_token,
        };
        self.credentials
            .set(TokenKind::Access, grant.access_token.clone());

        self.store
            .save_tokens(&grant.access_token, &current_refresh)
            .await?;

        tracing::info!("Strava access token refreshed and saved");
        Ok(Some(grant.access_token))
    }

    /// Current access token, refreshing once if none is held.
    pub async fn authorized_header(&self) -> Result<BearerToken, SyncError> {
        if let Some(token) = self.credentials.get(TokenKind::Access) {
            return Ok(BearerToken(token));
        }

        self.refresh_access_token().await?;

        self.credentials
            .get(TokenKind::Access)
            .map(BearerToken)
            .ok_or(SyncError::MissingCredentials)
    }
}
