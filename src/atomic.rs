// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Crash-safe file replacement.
//!
//! Content is written to a temporary file in the target's directory, flushed
//! to disk, and renamed over the target. Readers see either the old file or
//! the new one, never a partial write.

use crate::error::{ExportError, Result};
use std::io::Write;
use std::path::Path;

/// Prefix of in-flight temporary files.
pub const TEMP_PREFIX: &str = ".gpxbridge-";

/// Atomically replace `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ExportError::fs(dir, e))?;

    temp.write_all(contents)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| ExportError::fs(temp.path(), e))?;

    // On failure the temp file is dropped and removed; the target is untouched.
    temp.persist(path)
        .map_err(|e| ExportError::fs(path, e.error))?;

    Ok(())
}
