// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use gpxbridge::config::{ExportOptions, RateLimitConfig, RetryConfig};
use gpxbridge::error::{ExportError, Result};
use gpxbridge::models::{Activity, ActivityFilter, Credentials, Position, Stream};
use gpxbridge::services::{ActivitySource, RateLimiter, StravaClient, TokenManager};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Build an activity starting `id` days after 2024-01-01.
#[allow(dead_code)]
pub fn activity(id: u64, name: &str, activity_type: &str) -> Activity {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 7, 30, 0).unwrap() + ChronoDuration::days(id as i64);
    Activity {
        id,
        name: name.to_string(),
        activity_type: activity_type.to_string(),
        start_date: start,
        start_date_local: start.naive_utc(),
        distance_meters: 1000.0,
    }
}

/// A short three-point track.
#[allow(dead_code)]
pub fn sample_stream() -> Stream {
    Stream::new(
        vec![
            Position::new(37.3861, -122.0839).unwrap(),
            Position::new(37.3870, -122.0850).unwrap(),
            Position::new(37.3880, -122.0861).unwrap(),
        ],
        vec![10.0, 12.0, 15.0],
        vec![0.0, 10.0, 20.0],
    )
}

/// Export options writing into `root/out` with no inter-call delay.
#[allow(dead_code)]
pub fn options(root: &Path, count: usize) -> ExportOptions {
    let mut options = ExportOptions::new(count, "out");
    options.export_root = root.to_path_buf();
    options.delay_seconds = 0.0;
    options
}

type FailureFn = fn(u64) -> ExportError;

/// In-memory activity source with scripted stream failures.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeSource {
    activities: Vec<Activity>,
    streams: HashMap<u64, Stream>,
    failures: HashMap<u64, FailureFn>,
    listing_failure: Option<fn() -> ExportError>,
    fetched: Mutex<Vec<u64>>,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self {
            activities,
            ..Default::default()
        }
    }

    pub fn with_stream(mut self, id: u64, stream: Stream) -> Self {
        self.streams.insert(id, stream);
        self
    }

    pub fn failing(mut self, id: u64, failure: FailureFn) -> Self {
        self.failures.insert(id, failure);
        self
    }

    pub fn failing_listing(mut self, failure: fn() -> ExportError) -> Self {
        self.listing_failure = Some(failure);
        self
    }

    /// Activity IDs whose stream was requested, in order.
    pub fn fetched(&self) -> Vec<u64> {
        self.fetched.lock().unwrap().clone()
    }
}

impl ActivitySource for FakeSource {
    async fn list_recent(&self, count: usize, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        if let Some(failure) = self.listing_failure {
            return Err(failure());
        }
        Ok(self
            .activities
            .iter()
            .filter(|a| filter.matches(a))
            .take(count)
            .cloned()
            .collect())
    }

    async fn fetch_stream(&self, activity_id: u64) -> Result<Stream> {
        self.fetched.lock().unwrap().push(activity_id);
        if let Some(failure) = self.failures.get(&activity_id) {
            return Err(failure(activity_id));
        }
        Ok(self
            .streams
            .get(&activity_id)
            .cloned()
            .unwrap_or_else(sample_stream))
    }
}

/// Retry policy with millisecond delays and no jitter.
#[allow(dead_code)]
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        min_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        max_retries: 3,
        with_jitter: false,
    }
}

/// Quota windows small enough that a saturated window clears quickly.
#[allow(dead_code)]
pub fn fast_limits() -> RateLimitConfig {
    RateLimitConfig {
        short_window: Duration::from_millis(100),
        short_limit: 100,
        long_window: Duration::from_secs(1),
        long_limit: 1000,
        extra_delay: Duration::ZERO,
    }
}

/// Strava client pointed at a mock server.
#[allow(dead_code)]
pub fn mock_client(server_uri: &str) -> StravaClient {
    let http = reqwest::Client::new();
    let credentials = Credentials::new(
        "client-id".to_string(),
        "client-secret".to_string(),
        "refresh-token".to_string(),
    );
    let tokens = TokenManager::new(http.clone(), format!("{server_uri}/oauth/token"), credentials);
    StravaClient::from_parts(
        http,
        server_uri,
        tokens,
        RateLimiter::new(fast_limits()),
        fast_retry(),
    )
}

/// JSON body of a successful token refresh, valid for an hour.
#[allow(dead_code)]
pub fn token_body(access_token: &str) -> serde_json::Value {
    serde_json::json!({
        "token_type": "Bearer",
        "access_token": access_token,
        "refresh_token": "refresh-token",
        "expires_at": Utc::now().timestamp() + 3600,
        "expires_in": 3600
    })
}

/// JSON listing entry as returned by `/athlete/activities`.
#[allow(dead_code)]
pub fn summary_json(id: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("Ride {id}"),
        "sport_type": "Ride",
        "type": "Ride",
        "start_date": "2024-05-01T14:00:00Z",
        "start_date_local": "2024-05-01T07:00:00Z",
        "distance": 12000.0
    })
}
