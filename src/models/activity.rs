// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity model.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity summary, validated when the listing response is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Strava activity ID
    pub id: u64,
    /// Activity name/title
    pub name: String,
    /// Sport type (Ride, Run, Hike, etc.)
    pub activity_type: String,
    /// Start date/time (UTC)
    pub start_date: DateTime<Utc>,
    /// Start date/time in the athlete's local time zone
    pub start_date_local: NaiveDateTime,
    /// Distance in meters
    pub distance_meters: f64,
}

impl Activity {
    /// Public page for this activity.
    pub fn url(&self) -> String {
        format!("https://www.strava.com/activities/{}", self.id)
    }
}

/// Optional restrictions on which activities a run considers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityFilter {
    /// Only activities of this type (case-insensitive)
    pub activity_type: Option<String>,
    /// Only activities that started after this instant
    pub after: Option<DateTime<Utc>>,
    /// Only activities that started before this instant
    pub before: Option<DateTime<Utc>>,
}

impl ActivityFilter {
    /// Check an activity against every filter that is set.
    pub fn matches(&self, activity: &Activity) -> bool {
        if let Some(wanted) = &self.activity_type {
            if !activity.activity_type.eq_ignore_ascii_case(wanted.trim()) {
                return false;
            }
        }
        if self.after.is_some_and(|after| activity.start_date <= after) {
            return false;
        }
        if self.before.is_some_and(|before| activity.start_date >= before) {
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.activity_type.is_none() && self.after.is_none() && self.before.is_none()
    }
}
