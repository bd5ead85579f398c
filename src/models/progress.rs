// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Export progress ledger record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Which activities a given output directory already holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Export directory this ledger belongs to
    #[serde(default)]
    pub output_dir: PathBuf,
    /// Digest of the layout-affecting run options
    #[serde(default)]
    pub signature: String,
    /// Activity IDs whose GPX file has been written
    #[serde(default)]
    pub exported_activities: BTreeSet<u64>,
    /// When the last activity was recorded (RFC3339)
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl ProgressRecord {
    pub fn new(output_dir: PathBuf, signature: String) -> Self {
        Self {
            output_dir,
            signature,
            ..Default::default()
        }
    }

    pub fn contains(&self, activity_id: u64) -> bool {
        self.exported_activities.contains(&activity_id)
    }

    pub fn len(&self) -> usize {
        self.exported_activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exported_activities.is_empty()
    }
}
