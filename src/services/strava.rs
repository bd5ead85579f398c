// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for listing activities and fetching GPS streams.
//!
//! Handles:
//! - Paginated activity listing, most recent first
//! - Stream retrieval (latlng, altitude, time)
//! - Quota gating through the shared rate limiter
//! - Retry with exponential backoff on transient failures and 429s

use crate::config::{Config, RateLimitConfig, RetryConfig};
use crate::error::{ExportError, Result};
use crate::models::{Activity, ActivityFilter, Stream};
use crate::services::rate_limit::{QuotaSnapshot, RateLimitUsage, RateLimiter};
use crate::services::source::ActivitySource;
use crate::services::token::TokenManager;
use crate::time_utils::parse_strava_timestamp;
use backon::Retryable;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Strava's maximum page size for list endpoints.
const MAX_PER_PAGE: usize = 200;

/// Channels requested from the streams endpoint.
const STREAM_KEYS: &str = "latlng,altitude,time";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Strava API client.
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenManager,
    limiter: RateLimiter,
    retry: RetryConfig,
}

impl StravaClient {
    /// Create a client from process configuration.
    pub fn new(config: &Config, rate_limits: RateLimitConfig, retry: RetryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gpxbridge/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExportError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let tokens = TokenManager::new(http.clone(), &config.token_url, config.credentials());
        Ok(Self::from_parts(
            http,
            config.api_base_url.clone(),
            tokens,
            RateLimiter::new(rate_limits),
            retry,
        ))
    }

    /// Assemble a client from already-built parts.
    pub fn from_parts(
        http: reqwest::Client,
        base_url: impl Into<String>,
        tokens: TokenManager,
        limiter: RateLimiter,
        retry: RetryConfig,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            limiter,
            retry,
        }
    }

    /// List one page of activities (most recent first).
    ///
    /// Entries that fail validation are logged and dropped, so a page may
    /// hold fewer activities than the service returned. The second value is
    /// the raw entry count, used to detect the last page.
    pub async fn list_activities_page(
        &self,
        page: u32,
        per_page: usize,
        filter: &ActivityFilter,
    ) -> Result<(Vec<Activity>, usize)> {
        let url = format!("{}/athlete/activities", self.base_url);
        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(after) = filter.after {
            query.push(("after", after.timestamp().to_string()));
        }
        if let Some(before) = filter.before {
            query.push(("before", before.timestamp().to_string()));
        }

        let body = self
            .get_with_retry(&url, &query)
            .await?
            .ok_or_else(|| ExportError::Data("Activity listing endpoint not found".to_string()))?;

        let entries: Vec<Value> = serde_json::from_str(&body)
            .map_err(|e| ExportError::Data(format!("Activity listing JSON parse error: {}", e)))?;
        let raw_count = entries.len();

        let activities = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<StravaActivitySummary>(entry) {
                Ok(summary) => summary.into_activity(),
                Err(e) => {
                    tracing::warn!(page, error = %e, "Skipping malformed activity summary");
                    None
                }
            })
            .collect();

        Ok((activities, raw_count))
    }

    /// Fetch the GPS streams for an activity.
    pub async fn get_streams(&self, activity_id: u64) -> Result<Stream> {
        let url = format!("{}/activities/{}/streams", self.base_url, activity_id);
        let query = [
            ("keys", STREAM_KEYS.to_string()),
            ("key_by_type", "true".to_string()),
        ];

        match self.get_with_retry(&url, &query).await? {
            Some(body) => parse_streams(&body),
            None => {
                tracing::info!(activity_id, "No streams for activity");
                Ok(Stream::empty())
            }
        }
    }

    /// GET with quota gating and bounded retry.
    ///
    /// Returns `None` for 404.
    async fn get_with_retry(&self, url: &str, query: &[(&str, String)]) -> Result<Option<String>> {
        (|| self.get_once(url, query))
            .retry(self.retry.clone().into_backoff())
            .when(|e: &ExportError| e.is_retryable())
            .notify(|e: &ExportError, delay: Duration| {
                tracing::warn!(
                    url,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Strava request failed, retrying"
                );
            })
            .await
    }

    async fn get_once(&self, url: &str, query: &[(&str, String)]) -> Result<Option<String>> {
        self.limiter.acquire().await;
        let access_token = self.tokens.get_valid_access_token().await?;

        tracing::debug!(url, ?query, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| ExportError::Network(e.to_string()))?;

        if let Some(usage) = rate_limit_usage(response.headers()) {
            self.limiter.observe(usage);
        }

        self.check_response(response).await
    }

    /// Check response status and return the body if successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<Option<String>> {
        let status = response.status();

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ExportError::Network(format!("Failed to read body: {}", e)))?;
            return Ok(Some(body));
        }

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await.unwrap_or_default();

        // Rate limit - the server's refusal wins over any usage it reported
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Strava rate limit hit (429)");
            self.limiter.saturate();
            return Err(ExportError::RateLimited(format!("HTTP {}", status)));
        }

        if status.is_server_error() {
            return Err(ExportError::Network(format!("HTTP {}: {}", status, body)));
        }

        // Unauthorized, forbidden, or any other client error: re-authorization needed
        Err(ExportError::Auth(format!(
            "HTTP {}: {}; {}",
            status,
            body,
            ExportError::REAUTHORIZE_HINT
        )))
    }
}

impl ActivitySource for StravaClient {
    async fn list_recent(&self, count: usize, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let mut activities = Vec::with_capacity(count.min(MAX_PER_PAGE));
        let mut page = 1;

        tracing::info!(count, "Fetching recent activities");

        while activities.len() < count {
            let remaining = count - activities.len();
            // A type filter drops entries client-side, so always ask for full pages.
            let per_page = if filter.activity_type.is_some() {
                MAX_PER_PAGE
            } else {
                remaining.min(MAX_PER_PAGE)
            };

            let (page_activities, raw_count) =
                self.list_activities_page(page, per_page, filter).await?;

            if raw_count == 0 {
                tracing::info!(page, "No more activities available");
                break;
            }

            activities.extend(page_activities.into_iter().filter(|a| filter.matches(a)));
            tracing::info!(page, total = activities.len(), "Retrieved activity page");

            if raw_count < per_page {
                break;
            }
            page += 1;
        }

        activities.truncate(count);
        Ok(activities)
    }

    async fn fetch_stream(&self, activity_id: u64) -> Result<Stream> {
        self.get_streams(activity_id).await
    }

    fn quota(&self) -> Option<QuotaSnapshot> {
        Some(self.limiter.snapshot())
    }
}

/// Summary activity for list endpoints.
#[derive(Debug, Clone, Deserialize)]
struct StravaActivitySummary {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    sport_type: Option<String>,
    #[serde(default, rename = "type")]
    activity_type: Option<String>,
    start_date: String,
    #[serde(default)]
    start_date_local: Option<String>,
    #[serde(default)]
    distance: f64,
}

impl StravaActivitySummary {
    /// Validate into an [`Activity`], or `None` if the start date is unusable.
    fn into_activity(self) -> Option<Activity> {
        let Some(start_date) = parse_strava_timestamp(&self.start_date) else {
            tracing::warn!(
                activity_id = self.id,
                start_date = %self.start_date,
                "Skipping activity with unparseable start date"
            );
            return None;
        };

        // Strava marks local times with a `Z` suffix; the wall-clock value is what matters.
        let start_date_local = self
            .start_date_local
            .as_deref()
            .and_then(parse_strava_timestamp)
            .map(|d| d.naive_utc())
            .unwrap_or_else(|| start_date.naive_utc());

        let name = match self.name.trim() {
            "" => format!("Activity {}", self.id),
            trimmed => trimmed.to_string(),
        };

        let activity_type = self
            .sport_type
            .or(self.activity_type)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        Some(Activity {
            id: self.id,
            name,
            activity_type,
            start_date,
            start_date_local,
            distance_meters: self.distance.max(0.0),
        })
    }
}

/// Parse a streams response in either keyed (`key_by_type=true`) or list form.
fn parse_streams(body: &str) -> Result<Stream> {
    if body.trim().is_empty() {
        return Ok(Stream::empty());
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExportError::Data(format!("Stream JSON parse error: {}", e)))?;

    if !value.is_object() && !value.is_array() {
        return Err(ExportError::Data(format!(
            "Unexpected stream payload type: {}",
            value
        )));
    }

    let latlng = stream_channel(&value, "latlng");
    let altitude = stream_channel(&value, "altitude");
    let time = stream_channel(&value, "time");

    Ok(Stream::from_channels(latlng, altitude, time))
}

/// The `data` array of one channel; missing or malformed channels are empty.
fn stream_channel<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    let channel = match value {
        Value::Object(map) => map.get(key),
        Value::Array(list) => list
            .iter()
            .find(|c| c.get("type").and_then(Value::as_str) == Some(key)),
        _ => None,
    };

    channel
        .and_then(|c| c.get("data"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Read quota headers (`"<15min>,<daily>"`), preferring the read-specific ones.
fn rate_limit_usage(headers: &HeaderMap) -> Option<RateLimitUsage> {
    let header_pair = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_pair)
    };

    let (short_usage, long_usage) = header_pair("x-readratelimit-usage")
        .or_else(|| header_pair("x-ratelimit-usage"))?;
    let limits = header_pair("x-readratelimit-limit").or_else(|| header_pair("x-ratelimit-limit"));

    Some(RateLimitUsage {
        short_usage,
        long_usage,
        short_limit: limits.map(|(s, _)| s),
        long_limit: limits.map(|(_, l)| l),
    })
}

fn parse_pair(raw: &str) -> Option<(u32, u32)> {
    let (first, second) = raw.split_once(',')?;
    Some((first.trim().parse().ok()?, second.trim().parse().ok()?))
}
