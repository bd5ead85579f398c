// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable ledger of exported activities.
//!
//! One JSON file per export directory. Every update rewrites the whole file
//! through [`write_atomic`], so an interrupted run leaves either the previous
//! ledger or the new one on disk.

use crate::atomic::write_atomic;
use crate::error::{ExportError, Result};
use crate::models::ProgressRecord;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Ledger filename inside the export directory.
pub const PROGRESS_FILE_NAME: &str = ".strava_export_progress.json";

/// Owns the progress record for one export directory.
pub struct ProgressStore {
    path: PathBuf,
    record: ProgressRecord,
}

impl ProgressStore {
    /// Store for `output_dir`, starting from an empty in-memory record.
    pub fn new(output_dir: &Path, signature: impl Into<String>) -> Self {
        Self {
            path: output_dir.join(PROGRESS_FILE_NAME),
            record: ProgressRecord::new(output_dir.to_path_buf(), signature.into()),
        }
    }

    /// Forget everything recorded so far. The file is replaced on the next
    /// [`mark_processed`](Self::mark_processed).
    pub fn initialize(&mut self) {
        self.record = ProgressRecord::new(
            self.record.output_dir.clone(),
            std::mem::take(&mut self.record.signature),
        );
    }

    /// Read the ledger from disk.
    ///
    /// A missing file, an unparseable file, or a ledger written under a
    /// different signature all yield an empty record. Only I/O failures
    /// other than "not found" are errors.
    pub fn load(&mut self) -> Result<&ProgressRecord> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No progress file, starting fresh");
                self.initialize();
                return Ok(&self.record);
            }
            Err(e) => return Err(ExportError::fs(&self.path, e)),
        };

        match serde_json::from_str::<ProgressRecord>(&contents) {
            Ok(stored) if stored.signature != self.record.signature => {
                tracing::warn!(
                    path = %self.path.display(),
                    stored = %stored.signature,
                    current = %self.record.signature,
                    "Progress file was written with different export options, starting fresh"
                );
                self.initialize();
            }
            Ok(stored) => {
                tracing::info!(
                    path = %self.path.display(),
                    exported = stored.len(),
                    last_updated = ?stored.last_updated,
                    "Loaded export progress"
                );
                self.record.exported_activities = stored.exported_activities;
                self.record.last_updated = stored.last_updated;
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Progress file is unreadable, starting fresh"
                );
                self.initialize();
            }
        }
        Ok(&self.record)
    }

    pub fn is_processed(&self, activity_id: u64) -> bool {
        self.record.contains(activity_id)
    }

    /// Record `activity_id` as exported and persist the ledger.
    ///
    /// On failure the in-memory record is rolled back to match disk.
    pub fn mark_processed(&mut self, activity_id: u64) -> Result<()> {
        let inserted = self.record.exported_activities.insert(activity_id);
        let previous = self.record.last_updated.replace(format_utc_rfc3339(Utc::now()));

        if let Err(e) = self.persist() {
            if inserted {
                self.record.exported_activities.remove(&activity_id);
            }
            self.record.last_updated = previous;
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.record)
            .map_err(|e| ExportError::Data(format!("Failed to serialize progress: {}", e)))?;
        write_atomic(&self.path, &json)
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::TEMP_PREFIX;
    use std::fs;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::new(dir.path(), "sig");
        assert!(store.load().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_mark_processed_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::new(dir.path(), "sig");
        store.mark_processed(7).unwrap();
        store.mark_processed(3).unwrap();
        store.mark_processed(7).unwrap();

        let mut reopened = ProgressStore::new(dir.path(), "sig");
        let record = reopened.load().unwrap();
        assert_eq!(record.exported_activities.iter().copied().collect::<Vec<_>>(), vec![3, 7]);
        assert!(record.last_updated.is_some());
        assert!(reopened.is_processed(3));
        assert!(!reopened.is_processed(4));
    }

    #[test]
    fn test_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::new(dir.path(), "abc123");
        store.mark_processed(42).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join(PROGRESS_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(json["signature"], "abc123");
        assert_eq!(json["exported_activities"], serde_json::json!([42]));
        assert!(json["output_dir"].is_string());
        assert!(json["last_updated"].is_string());
    }

    #[test]
    fn test_signature_mismatch_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::new(dir.path(), "flat");
        store.mark_processed(1).unwrap();

        let mut other = ProgressStore::new(dir.path(), "by-type");
        assert!(other.load().unwrap().is_empty());
        assert_eq!(other.record().signature, "by-type");
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROGRESS_FILE_NAME), b"{\"exported_activities\": [1, 2").unwrap();

        let mut store = ProgressStore::new(dir.path(), "sig");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_abandoned_temp_file_leaves_ledger_intact() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::new(dir.path(), "sig");
        store.mark_processed(10).unwrap();
        store.mark_processed(11).unwrap();

        // A crash between writing the temp file and renaming it.
        fs::write(
            dir.path().join(format!("{TEMP_PREFIX}crash.tmp")),
            b"{\"exported_activities\": [10, 11, 1",
        )
        .unwrap();

        let mut reopened = ProgressStore::new(dir.path(), "sig");
        assert_eq!(reopened.load().unwrap().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_write_rolls_back_and_keeps_previous_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::new(dir.path(), "sig");
        store.mark_processed(1).unwrap();
        let before = fs::read(store.path()).unwrap();

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o500)).unwrap();
        let result = store.mark_processed(2);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o700)).unwrap();

        // Running as root ignores directory permissions; only check when it failed.
        if result.is_err() {
            assert!(!store.is_processed(2));
            assert_eq!(fs::read(store.path()).unwrap(), before);
        }
    }

    #[test]
    fn test_initialize_discards_loaded_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::new(dir.path(), "sig");
        store.mark_processed(5).unwrap();
        store.initialize();
        assert!(!store.is_processed(5));
        assert_eq!(store.record().signature, "sig");
    }
}
