// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Capability interface for services that can supply activities and tracks.

use crate::error::Result;
use crate::models::{Activity, ActivityFilter, Stream};
use crate::services::rate_limit::QuotaSnapshot;
use std::future::Future;

/// A remote service the exporter can pull activities from.
///
/// The exporter only talks to this trait, so another service can be added
/// without touching the pipeline.
pub trait ActivitySource {
    /// Up to `count` activities matching `filter`, most recent first.
    fn list_recent(
        &self,
        count: usize,
        filter: &ActivityFilter,
    ) -> impl Future<Output = Result<Vec<Activity>>>;

    /// GPS channels for one activity. No GPS data yields an empty stream.
    fn fetch_stream(&self, activity_id: u64) -> impl Future<Output = Result<Stream>>;

    /// Current quota usage, for sources that track one.
    fn quota(&self) -> Option<QuotaSnapshot> {
        None
    }
}
