// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer for Strava OAuth tokens.

pub mod env_file;

pub use env_file::{StoredTokens, TokenStore};

/// Keys under which tokens are written to the credentials file.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "STRAVA_ACCESS_TOKEN";
    pub const REFRESH_TOKEN: &str = "STRAVA_REFRESH_TOKEN";
}
