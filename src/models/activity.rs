// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity as returned by the list and detail endpoints.

use serde::{Deserialize, Serialize};

/// Activity fetched from Strava. Read-only once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    /// Strava activity ID (dedup key in Notion)
    pub id: u64,
    /// Activity name/title
    #[serde(default)]
    pub name: Option<String>,
    /// Local start date/time (ISO 8601, no offset)
    #[serde(default)]
    pub start_date_local: String,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: u64,
    /// Activity type (Ride, Run, Hike, etc.)
    #[serde(rename = "type", default)]
    pub activity_type: Option<String>,
    /// Elevation gain in meters
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    /// Only present on detailed activities
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    /// Rate of perceived exertion (1-10)
    #[serde(default)]
    pub perceived_exertion: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ActivityRecord {
    /// Calendar date of the activity (`YYYY-MM-DD`).
    pub fn start_day(&self) -> &str {
        self.start_date_local
            .split('T')
            .next()
            .unwrap_or(&self.start_date_local)
    }

    /// Distance in kilometers, rounded to 2 decimals.
    pub fn distance_km(&self) -> f64 {
        round2(self.distance / 1000.0)
    }

    /// Moving time in minutes, rounded to 2 decimals.
    pub fn duration_minutes(&self) -> f64 {
        round2(self.moving_time as f64 / 60.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
