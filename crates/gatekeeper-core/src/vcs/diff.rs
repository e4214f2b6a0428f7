//! Unified-diff splitting and size filtering. Pure functions.

use super::FileDiff;

const DIFF_PREFIX: &str = "diff --git ";

/// Split a unified diff into per-file entries at each `diff --git ` boundary.
#[must_use]
pub fn split_diffs(raw: &str) -> Vec<FileDiff> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    raw.split(DIFF_PREFIX)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| FileDiff {
            path: extract_file_path(part),
            content: format!("{DIFF_PREFIX}{part}"),
        })
        .collect()
}

/// Parse the destination path out of the `a/<path> b/<path>` header line.
fn extract_file_path(block: &str) -> String {
    let first_line = block.lines().next().unwrap_or(block);

    match first_line.split_once(' ') {
        Some((_, b_side)) => b_side.strip_prefix("b/").unwrap_or(b_side).to_string(),
        None => first_line.strip_prefix("a/").unwrap_or(first_line).to_string(),
    }
}

/// Partition diffs by content size. `max_size == 0` means no limit.
/// Returns `(included, skipped)`.
#[must_use]
pub fn filter_by_size(diffs: Vec<FileDiff>, max_size: usize) -> (Vec<FileDiff>, Vec<FileDiff>) {
    if max_size == 0 {
        return (diffs, Vec::new());
    }

    diffs.into_iter().partition(|d| d.content.len() <= max_size)
}
