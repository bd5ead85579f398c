// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - export pipeline components.

pub mod exporter;
pub mod gpx;
pub mod progress;
pub mod rate_limit;
pub mod source;
pub mod strava;
pub mod token;

pub use exporter::{ActivityFailure, ExportSummary, Exporter, Stage};
pub use progress::ProgressStore;
pub use rate_limit::{QuotaSnapshot, RateLimitUsage, RateLimiter};
pub use source::ActivitySource;
pub use strava::StravaClient;
pub use token::TokenManager;
