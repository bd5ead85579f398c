// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! gpxbridge: export Strava activities as GPX files.
//!
//! The pipeline lists recent activities, downloads their GPS streams under
//! Strava's request quotas, renders GPX 1.1 documents, and records each
//! finished activity in a crash-safe ledger so an interrupted run can resume.

pub mod atomic;
pub mod config;
pub mod error;
pub mod models;
pub mod paths;
pub mod services;
pub mod time_utils;

pub use config::{Config, ExportOptions, RateLimitConfig, RetryConfig};
pub use error::{ExportError, Result};
pub use services::{ExportSummary, Exporter, StravaClient};
