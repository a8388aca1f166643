// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava OAuth credentials shared across sync tasks.

use dashmap::DashMap;

/// Which of the two OAuth tokens a value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Short-lived, derived from the refresh token
    Access,
    /// Long-lived identity anchor
    Refresh,
}

/// OAuth client credentials plus the current token pair.
///
/// Each token is updated independently; readers never block on a refresh
/// happening in another task. A stale access token only costs one extra
/// refresh on next use.
#[derive(Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    tokens: DashMap<TokenKind, String>,
}

impl Credentials {
    pub fn new(
        client_id: String,
        client_secret: String,
        refresh_token: Option<String>,
        access_token: Option<String>,
    ) -> Self {
        let tokens = DashMap::new();
        if let Some(token) = refresh_token {
            tokens.insert(TokenKind::Refresh, token);
        }
        if let Some(token) = access_token {
            tokens.insert(TokenKind::Access, token);
        }
        Self {
            client_id,
            client_secret,
            tokens,
        }
    }

    pub fn get(&self, kind: TokenKind) -> Option<String> {
        self.tokens.get(&kind).map(|t| t.value().clone())
    }

    pub fn set(&self, kind: TokenKind, value: String) {
        self.tokens.insert(kind, value);
    }

    pub fn has_refresh_token(&self) -> bool {
        self.tokens.contains_key(&TokenKind::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_update_independently() {
        let creds = Credentials::new("1".to_string(), "s".to_string(), Some("r1".to_string()), None);
        assert!(creds.has_refresh_token());
        assert_eq!(creds.get(TokenKind::Access), None);

        creds.set(TokenKind::Access, "a1".to_string());
        creds.set(TokenKind::Refresh, "r2".to_string());

        assert_eq!(creds.get(TokenKind::Access).as_deref(), Some("a1"));
        assert_eq!(creds.get(TokenKind::Refresh).as_deref(), Some("r2"));
    }
}
