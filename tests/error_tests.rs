// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use gpxbridge::error::ExportError;
use std::path::PathBuf;

#[test]
fn test_retryable_errors() {
    assert!(ExportError::Network("connection reset".to_string()).is_retryable());
    assert!(ExportError::RateLimited("HTTP 429".to_string()).is_retryable());
}

#[test]
fn test_non_retryable_errors() {
    assert!(!ExportError::Auth("HTTP 401".to_string()).is_retryable());
    assert!(!ExportError::Data("bad json".to_string()).is_retryable());
    assert!(!ExportError::PathEscape(PathBuf::from("../out")).is_retryable());
    assert!(!ExportError::Config("count".to_string()).is_retryable());
}

#[test]
fn test_messages_name_the_failure() {
    let err = ExportError::PathEscape(PathBuf::from("../out"));
    assert_eq!(err.to_string(), "Path ../out escapes the export root");

    let err = ExportError::Auth(ExportError::REAUTHORIZE_HINT.to_string());
    assert!(err.to_string().starts_with("Strava authorization failed"));
}
