// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Export error types.
//!
//! Every failure in the pipeline lands in one of these buckets. Only
//! [`ExportError::Auth`] aborts a run once activities are being exported;
//! everything else is recorded against the activity and the loop moves on.

use std::path::PathBuf;

/// Pipeline error type.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Strava authorization failed: {0}")]
    Auth(String),

    #[error("Strava rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Data(String),

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path {0} escapes the export root")]
    PathEscape(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ExportError {
    /// Guidance appended to fatal auth failures.
    pub const REAUTHORIZE_HINT: &'static str =
        "re-authorize the application and update STRAVA_REFRESH_TOKEN";

    /// Wrap an I/O error with the path it happened on.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should stop the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExportError::Auth(_) | ExportError::Config(_))
    }

    /// Whether the failed request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExportError::Network(_) | ExportError::RateLimited(_))
    }
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, ExportError>;
