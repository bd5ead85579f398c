// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Output path policy: slugs, filenames, and the export-root guard.

use crate::error::{ExportError, Result};
use crate::models::Activity;
use crate::time_utils::compact_date;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Longest slug used in a filename component.
const MAX_SLUG_LEN: usize = 30;

/// Reduce arbitrary text to `[a-z0-9-]`, at most `max_len` characters.
///
/// Anything outside ASCII letters and digits (separators, control
/// characters, punctuation, non-ASCII) becomes a single `-`. Returns
/// `fallback` if nothing usable remains.
pub fn slugify(text: &str, max_len: usize, fallback: &str) -> String {
    let mut slug = String::with_capacity(text.len().min(max_len));
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.truncate(max_len);
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug.to_string()
    }
}

/// `<YYYYMMDD>_<type>_<name>_<id>.gpx`; unique per activity ID.
pub fn export_filename(activity: &Activity) -> String {
    format!(
        "{}_{}_{}_{}.gpx",
        compact_date(activity.start_date_local),
        slugify(&activity.activity_type, MAX_SLUG_LEN, "unknown-type"),
        slugify(&activity.name, MAX_SLUG_LEN, "unnamed-activity"),
        activity.id
    )
}

/// Subdirectory name used when organizing by activity type.
pub fn type_directory(activity: &Activity) -> String {
    slugify(&activity.activity_type, MAX_SLUG_LEN, "unknown-type")
}

/// Resolve `requested` against `root`, create it, and return its canonical path.
///
/// Rejects (before creating anything) paths whose `..` components lead
/// outside `root`, and (after creating) paths that escape via symlinks.
pub fn resolve_output_dir(root: &Path, requested: &Path) -> Result<PathBuf> {
    let root = root.canonicalize().map_err(|e| ExportError::fs(root, e))?;
    let candidate = normalize(&root.join(requested));

    if !candidate.starts_with(&root) {
        return Err(ExportError::PathEscape(requested.to_path_buf()));
    }

    fs::create_dir_all(&candidate).map_err(|e| ExportError::fs(&candidate, e))?;
    let resolved = candidate
        .canonicalize()
        .map_err(|e| ExportError::fs(&candidate, e))?;

    if !resolved.starts_with(&root) {
        return Err(ExportError::PathEscape(requested.to_path_buf()));
    }
    Ok(resolved)
}

/// Join `relative` onto `base`, failing if the result is not strictly inside `base`.
pub fn join_within(base: &Path, relative: &Path) -> Result<PathBuf> {
    let joined = normalize(&base.join(relative));
    if joined == base || !joined.starts_with(base) {
        return Err(ExportError::PathEscape(joined));
    }
    Ok(joined)
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
