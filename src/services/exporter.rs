// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Export orchestration.
//!
//! Strictly sequential: each activity is fetched, converted, written and
//! recorded before the next one starts, so cancelling between activities
//! never loses finished work.

use crate::atomic::write_atomic;
use crate::config::ExportOptions;
use crate::error::{ExportError, Result};
use crate::models::Activity;
use crate::paths::{export_filename, join_within, resolve_output_dir, type_directory};
use crate::services::gpx::to_gpx;
use crate::services::progress::ProgressStore;
use crate::services::source::ActivitySource;
use std::fmt;
use std::path::{Path, PathBuf};

/// Log quota usage after this many activities.
const QUOTA_LOG_INTERVAL: usize = 10;

/// Pipeline step an activity failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Convert,
    Write,
    Record,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Fetch => "fetch",
            Stage::Convert => "convert",
            Stage::Write => "write",
            Stage::Record => "record",
        })
    }
}

/// One activity that could not be exported.
#[derive(Debug)]
pub struct ActivityFailure {
    pub activity_id: u64,
    pub stage: Stage,
    pub error: ExportError,
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct ExportSummary {
    /// Activities returned by the listing
    pub listed: usize,
    /// Files written this run
    pub exported: usize,
    /// Already recorded in the progress ledger
    pub skipped: usize,
    /// Exported with no GPS points
    pub empty_tracks: usize,
    pub failures: Vec<ActivityFailure>,
    /// Final export directory
    pub output_dir: PathBuf,
}

impl ExportSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Exported {
    path: PathBuf,
    empty: bool,
}

/// Drives one export run against an [`ActivitySource`].
pub struct Exporter<S> {
    source: S,
}

impl<S: ActivitySource> Exporter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Export up to `options.count` recent activities into `options.output_dir`.
    ///
    /// Returns an error only for invalid options, an unusable output
    /// directory, a failed listing, or an authorization failure. Every other
    /// per-activity failure is recorded in the summary.
    pub async fn run(&self, options: &ExportOptions) -> Result<ExportSummary> {
        options.check()?;
        let output_dir = resolve_output_dir(&options.export_root, &options.output_dir)?;

        let mut progress = ProgressStore::new(&output_dir, options.signature());
        if options.resume {
            let record = progress.load()?;
            tracing::info!(already_exported = record.len(), "Resuming export");
        } else {
            progress.initialize();
        }

        tracing::info!(
            count = options.count,
            output_dir = %output_dir.display(),
            organize_by_type = options.organize_by_type,
            "Listing activities"
        );
        let activities = self.source.list_recent(options.count, &options.filter).await?;
        tracing::info!(found = activities.len(), "Activities listed");

        let mut summary = ExportSummary {
            listed: activities.len(),
            output_dir: output_dir.clone(),
            ..Default::default()
        };

        for (index, activity) in activities.iter().enumerate() {
            if progress.is_processed(activity.id) {
                tracing::debug!(activity_id = activity.id, "Already exported, skipping");
                summary.skipped += 1;
                continue;
            }

            match self
                .export_activity(&output_dir, options.organize_by_type, activity, &mut progress)
                .await
            {
                Ok(exported) => {
                    tracing::info!(
                        activity_id = activity.id,
                        progress = %format!("{}/{}", index + 1, activities.len()),
                        path = %exported.path.display(),
                        empty = exported.empty,
                        "Exported activity"
                    );
                    summary.exported += 1;
                    if exported.empty {
                        summary.empty_tracks += 1;
                    }
                }
                Err((stage, error)) if error.is_fatal() => {
                    tracing::error!(
                        activity_id = activity.id,
                        stage = %stage,
                        error = %error,
                        exported = summary.exported,
                        "Aborting export; progress up to the last completed activity is saved"
                    );
                    return Err(error);
                }
                Err((stage, error)) => {
                    tracing::warn!(
                        activity_id = activity.id,
                        stage = %stage,
                        error = %error,
                        "Failed to export activity"
                    );
                    summary.failures.push(ActivityFailure {
                        activity_id: activity.id,
                        stage,
                        error,
                    });
                }
            }

            if (index + 1) % QUOTA_LOG_INTERVAL == 0 {
                if let Some(quota) = self.source.quota() {
                    tracing::info!(
                        short_used = quota.short_used,
                        short_limit = quota.short_limit,
                        long_used = quota.long_used,
                        long_limit = quota.long_limit,
                        "API quota usage"
                    );
                }
            }
        }

        tracing::info!(
            exported = summary.exported,
            skipped = summary.skipped,
            empty_tracks = summary.empty_tracks,
            failed = summary.failures.len(),
            "Export finished"
        );
        Ok(summary)
    }

    async fn export_activity(
        &self,
        output_dir: &Path,
        organize_by_type: bool,
        activity: &Activity,
        progress: &mut ProgressStore,
    ) -> std::result::Result<Exported, (Stage, ExportError)> {
        let stream = self
            .source
            .fetch_stream(activity.id)
            .await
            .map_err(|e| (Stage::Fetch, e))?;

        let document = to_gpx(activity, &stream).map_err(|e| (Stage::Convert, e))?;

        let relative = if organize_by_type {
            Path::new(&type_directory(activity)).join(export_filename(activity))
        } else {
            PathBuf::from(export_filename(activity))
        };
        let path = join_within(output_dir, &relative).map_err(|e| (Stage::Write, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| (Stage::Write, ExportError::fs(parent, e)))?;
        }
        write_atomic(&path, &document).map_err(|e| (Stage::Write, e))?;

        progress
            .mark_processed(activity.id)
            .map_err(|e| (Stage::Record, e))?;

        Ok(Exported {
            path,
            empty: stream.is_empty(),
        })
    }
}
