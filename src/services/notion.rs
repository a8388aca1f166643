// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notion API client for the destination database.
//!
//! Only two calls are needed: a filtered database query to test whether an
//! activity is already present, and page creation to insert one.

use crate::config::NotionDatabaseId;
use crate::error::SyncError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const NOTION_API_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Typed value for one database column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Title(String),
    Number(f64),
    /// Calendar date, `YYYY-MM-DD`
    Date(String),
    Select(String),
    RichText(String),
}

impl FieldValue {
    /// Notion property object for this value.
    pub fn to_property(&self) -> Value {
        match self {
            FieldValue::Title(text) => json!({ "title": [{ "text": { "content": text } }] }),
            FieldValue::Number(n) => json!({ "number": n }),
            FieldValue::Date(day) => json!({ "date": { "start": day } }),
            FieldValue::Select(name) => json!({ "select": { "name": name } }),
            FieldValue::RichText(text) => {
                json!({ "rich_text": [{ "text": { "content": text } }] })
            }
        }
    }
}

/// Column name to value, in insertion order.
pub type FieldSet = Vec<(String, FieldValue)>;

/// Page creation acknowledgement.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WriteReceipt {
    /// Notion page id
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Capabilities the sync pipeline needs from the destination store.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Whether a row with `key_field == key` exists. A missing or unshared
    /// database is [`SyncError::SinkNotFound`].
    async fn query_by_key(
        &self,
        database_id: &NotionDatabaseId,
        key_field: &str,
        key: u64,
    ) -> Result<bool, SyncError>;

    /// Insert one row.
    async fn insert_record(
        &self,
        database_id: &NotionDatabaseId,
        fields: &FieldSet,
    ) -> Result<WriteReceipt, SyncError>;
}

/// Notion API client.
#[derive(Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl NotionClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, NOTION_API_URL)
    }

    /// Client pointed at an alternate API root (used by tests).
    pub fn with_base_url(token: String, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
}

#[async_trait]
impl RecordSink for NotionClient {
    async fn query_by_key(
        &self,
        database_id: &NotionDatabaseId,
        key_field: &str,
        key: u64,
    ) -> Result<bool, SyncError> {
        let url = format!("{}/databases/{}/query", self.base_url, database_id);
        let body = json!({
            "filter": {
                "property": key_field,
                "number": { "equals": key }
            },
            "page_size": 1
        });

        let response = self
            .post(&url, &body)
            .await
            .map_err(|e| SyncError::SinkQuery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 => SyncError::SinkNotFound {
                    database_id: database_id.to_string(),
                },
                429 => {
                    tracing::warn!("Notion rate limit hit (429)");
                    SyncError::RateLimited("Notion")
                }
                _ => SyncError::SinkQuery(format!("HTTP {}: {}", status, body)),
            });
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| SyncError::SinkQuery(format!("JSON parse error: {}", e)))?;
        Ok(!parsed.results.is_empty())
    }

    async fn insert_record(
        &self,
        database_id: &NotionDatabaseId,
        fields: &FieldSet,
    ) -> Result<WriteReceipt, SyncError> {
        let body = page_body(database_id, fields);

        let response = self
            .post(&format!("{}/pages", self.base_url), &body)
            .await
            .map_err(|e| SyncError::SinkWrite {
                status: 0,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 => SyncError::SinkNotFound {
                    database_id: database_id.to_string(),
                },
                429 => {
                    tracing::warn!("Notion rate limit hit (429)");
                    SyncError::RateLimited("Notion")
                }
                code => SyncError::SinkWrite { status: code, body },
            });
        }

        response.json().await.map_err(|e| SyncError::SinkWrite {
            status: status.as_u16(),
            body: format!("JSON parse error: {}", e),
        })
    }
}

/// Request body for page creation.
pub fn page_body(database_id: &NotionDatabaseId, fields: &FieldSet) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_property()))
        .collect();

    json!({
        "parent": { "database_id": database_id.as_str() },
        "properties": properties
    })
}
