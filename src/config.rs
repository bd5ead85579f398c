// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Configuration for an export run.
//!
//! Credentials are read once from the environment at startup and threaded
//! explicitly into the pipeline. Run options are validated once before the
//! run starts and never re-checked downstream.

use crate::error::ExportError;
use crate::models::{ActivityFilter, Credentials};
use backon::ExponentialBuilder;
use sha2::{Digest, Sha256};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Default Strava REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://www.strava.com/api/v3";
/// Default Strava OAuth token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Process-level configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Long-lived refresh token obtained out of band
    pub strava_refresh_token: String,
    /// REST API base URL
    pub api_base_url: String,
    /// OAuth token endpoint
    pub token_url: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_refresh_token: "test_refresh_token".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
            strava_refresh_token: required("STRAVA_REFRESH_TOKEN")?,
            api_base_url: env::var("STRAVA_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            token_url: env::var("STRAVA_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
        })
    }

    /// Credentials for the token manager. No access token is known yet.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.strava_client_id.clone(),
            self.strava_client_secret.clone(),
            self.strava_refresh_token.clone(),
        )
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

/// Parameters of one export run.
#[derive(Debug, Clone, Validate)]
pub struct ExportOptions {
    /// Number of most recent activities to consider
    #[validate(range(min = 1, max = 10000))]
    pub count: usize,
    /// Output directory, relative to `export_root` unless absolute
    #[validate(custom(function = "validate_output_dir"))]
    pub output_dir: PathBuf,
    /// Directory the output must stay inside
    pub export_root: PathBuf,
    /// Nest files under a directory per activity type
    pub organize_by_type: bool,
    /// Extra delay after every API call, in seconds
    #[validate(range(min = 0.0, max = 60.0))]
    pub delay_seconds: f64,
    /// Skip activities recorded in the progress ledger
    pub resume: bool,
    /// Listing filters
    pub filter: ActivityFilter,
}

impl ExportOptions {
    pub fn new(count: usize, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            count,
            output_dir: output_dir.into(),
            export_root: PathBuf::from("."),
            organize_by_type: false,
            delay_seconds: 1.0,
            resume: false,
            filter: ActivityFilter::default(),
        }
    }

    /// Validate, mapping failures into the pipeline's error type.
    pub fn check(&self) -> Result<(), ExportError> {
        self.validate()
            .map_err(|e| ExportError::Config(e.to_string().replace('\n', "; ")))
    }

    /// Short digest of the options that change what lands on disk.
    ///
    /// A progress ledger written under a different signature is not reused.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("organize_by_type={}\n", self.organize_by_type));
        hasher.update(format!(
            "type={}\n",
            self.filter
                .activity_type
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
        ));
        hasher.update(format!("after={:?}\n", self.filter.after.map(|d| d.timestamp())));
        hasher.update(format!(
            "before={:?}\n",
            self.filter.before.map(|d| d.timestamp())
        ));
        hex::encode(&hasher.finalize()[..8])
    }

    /// Inter-call delay as a duration. Negative or NaN input counts as zero.
    pub fn extra_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds).unwrap_or(Duration::ZERO)
    }
}

fn validate_output_dir(dir: &Path) -> Result<(), ValidationError> {
    if dir.as_os_str().is_empty() || dir.to_string_lossy().trim().is_empty() {
        return Err(ValidationError::new("output_dir_empty"));
    }
    Ok(())
}

/// Request quota windows.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub short_window: Duration,
    pub short_limit: u32,
    pub long_window: Duration,
    pub long_limit: u32,
    /// Fixed pause after every call, independent of quota state
    pub extra_delay: Duration,
}

impl Default for RateLimitConfig {
    /// Strava's published read limits: 100 per 15 minutes, 1000 per day.
    fn default() -> Self {
        Self {
            short_window: Duration::from_secs(15 * 60),
            short_limit: 100,
            long_window: Duration::from_secs(24 * 60 * 60),
            long_limit: 1000,
            extra_delay: Duration::from_secs(1),
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn with_extra_delay(mut self, extra_delay: Duration) -> Self {
        self.extra_delay = extra_delay;
        self
    }
}

/// Backoff settings for transient request failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: 3,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Build an exponential (factor 2) backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}
