// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token persistence in a dotenv-style `KEY=value` file.
//!
//! Both tokens are written in one file replacement (temp file + rename), so
//! a crash leaves either the old pair or the new pair on disk. Lines that
//! are not token keys are preserved as-is.

use crate::db::keys;
use crate::error::SyncError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Tokens as last written by [`TokenStore::save_tokens`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Persists Strava tokens to the credentials file.
pub struct TokenStore {
    path: Option<PathBuf>,
    /// Last saved pair, kept for inspection (always populated, even with a file).
    last_saved: Mutex<Option<StoredTokens>>,
    /// Serializes file rewrites within this process.
    write_lock: tokio::sync::Mutex<()>,
}

impl TokenStore {
    /// Store backed by the dotenv file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            last_saved: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// In-memory store (offline, for testing).
    pub fn new_mock() -> Self {
        Self {
            path: None,
            last_saved: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Write both tokens as a single update.
    pub async fn save_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), SyncError> {
        if let Some(path) = &self.path {
            let _guard = self.write_lock.lock().await;
            write_env_file(
                path,
                &[
                    (keys::ACCESS_TOKEN, access_token),
                    (keys::REFRESH_TOKEN, refresh_token),
                ],
            )
            .await
            .map_err(|e| SyncError::Persist(format!("{}: {}", path.display(), e)))?;
            tracing::debug!(path = %path.display(), "Strava tokens persisted");
        }

        let tokens = StoredTokens {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        };
        // Last-writer-wins, a poisoned lock still holds usable data.
        *self
            .last_saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tokens);
        Ok(())
    }

    /// The pair written by the most recent successful save.
    pub fn last_saved(&self) -> Option<StoredTokens> {
        self.last_saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Replace (or append) `updates` in the dotenv file at `path`.
async fn write_env_file(path: &Path, updates: &[(&str, &str)]) -> std::io::Result<()> {
    let current = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let contents = merge_env(&current, updates);

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await
}

fn merge_env(current: &str, updates: &[(&str, &str)]) -> String {
    let mut pending: Vec<&(&str, &str)> = updates.iter().collect();
    let mut out = String::with_capacity(current.len() + 128);

    for line in current.lines() {
        let key = line
            .trim_start()
            .trim_start_matches("export ")
            .split('=')
            .next()
            .unwrap_or("")
            .trim();
        match pending.iter().position(|(k, _)| *k == key) {
            Some(idx) => {
                let (k, v) = pending.remove(idx);
                out.push_str(&format_entry(k, v));
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }

    for (k, v) in pending {
        out.push_str(&format_entry(k, v));
        out.push('\n');
    }
    out
}

fn format_entry(key: &str, value: &str) -> String {
    format!("{}='{}'", key, value)
}
