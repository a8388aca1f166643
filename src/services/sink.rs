// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Deduplicating writer in front of the Notion database.
//!
//! `write` is not idempotent on its own: callers check `exists` first and
//! only write on `false`. The check and the insert are separate requests, so
//! two overlapping runs can still both insert the same activity.

use crate::config::{FieldMapping, NotionDatabaseId};
use crate::error::SyncError;
use crate::models::ActivityRecord;
use crate::services::notion::{FieldSet, FieldValue, RecordSink, WriteReceipt};
use std::sync::Arc;

const UNTITLED: &str = "Activité sans nom";
const UNKNOWN_TYPE: &str = "Inconnu";

pub struct SinkGateway {
    client: Arc<dyn RecordSink>,
    database_id: NotionDatabaseId,
    mapping: FieldMapping,
}

impl SinkGateway {
    pub fn new(
        client: Arc<dyn RecordSink>,
        database_id: NotionDatabaseId,
        mapping: FieldMapping,
    ) -> Self {
        Self {
            client,
            database_id,
            mapping,
        }
    }

    pub fn database_id(&self) -> &NotionDatabaseId {
        &self.database_id
    }

    /// Whether the activity is already in the database.
    pub async fn exists(&self, record_id: u64) -> Result<bool, SyncError> {
        self.client
            .query_by_key(&self.database_id, &self.mapping.strava_id, record_id)
            .await
    }

    /// Insert the activity. Call only after `exists` returned `false`.
    pub async fn write(&self, record: &ActivityRecord) -> Result<WriteReceipt, SyncError> {
        let fields = build_fields(&self.mapping, record);
        if fields.is_empty() {
            return Err(SyncError::SinkWrite {
                status: 0,
                body: format!("no mapped columns for activity {}", record.id),
            });
        }

        let receipt = self.client.insert_record(&self.database_id, &fields).await?;
        tracing::debug!(activity_id = record.id, page_id = %receipt.id, "Activity written to Notion");
        Ok(receipt)
    }
}

/// Column values for an activity.
///
/// Columns with an empty name are skipped. Optional numbers the activity does
/// not carry are left out entirely so Notion keeps the cell empty.
pub fn build_fields(mapping: &FieldMapping, record: &ActivityRecord) -> FieldSet {
    let optional_number = |value: Option<f64>| value.map(FieldValue::Number);

    let candidates = [
        (
            &mapping.title,
            Some(FieldValue::Title(
                record.name.clone().unwrap_or_else(|| UNTITLED.to_string()),
            )),
        ),
        (&mapping.strava_id, Some(FieldValue::Number(record.id as f64))),
        (
            &mapping.date,
            Some(FieldValue::Date(record.start_day().to_string())),
        ),
        (&mapping.distance, Some(FieldValue::Number(record.distance_km()))),
        (
            &mapping.duration,
            Some(FieldValue::Number(record.duration_minutes())),
        ),
        (
            &mapping.sport_type,
            Some(FieldValue::Select(
                record
                    .activity_type
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            )),
        ),
        (&mapping.elevation, optional_number(record.total_elevation_gain)),
        (&mapping.calories, optional_number(record.calories)),
        (&mapping.heart_rate, optional_number(record.average_heartrate)),
        (
            &mapping.perceived_exertion,
            optional_number(record.perceived_exertion),
        ),
        (
            &mapping.description,
            Some(FieldValue::RichText(
                record.description.clone().unwrap_or_default(),
            )),
        ),
    ];

    candidates
        .into_iter()
        .filter(|(column, _)| !column.trim().is_empty())
        .filter_map(|(column, value)| value.map(|v| (column.clone(), v)))
        .collect()
}
