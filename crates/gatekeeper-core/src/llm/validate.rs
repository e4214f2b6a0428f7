//! Line-number validation of LLM output against the actual diffs.
//!
//! Models sometimes report issues on lines that are not part of the change,
//! or on files that are not in the diff at all. Every diagnostic must point
//! into a file present in the diff set, at a line no greater than the highest
//! line any hunk header (`+start,count`) in that file reaches.

use std::collections::HashMap;

use crate::report::Diagnostic;
use crate::vcs::FileDiff;

/// Upper bound used when a diff carries no hunk headers at all. Generous on
/// purpose: a degenerate diff should not silence a real finding.
const NO_HUNK_UPPER_BOUND: u32 = 10_000;

/// Drop diagnostics whose file or line falls outside the diffs.
#[must_use]
pub fn validate_line_numbers(diagnostics: Vec<Diagnostic>, diffs: &[FileDiff]) -> Vec<Diagnostic> {
    let max_lines = build_diff_line_map(diffs);

    diagnostics
        .into_iter()
        .filter(|d| match max_lines.get(d.file.as_str()) {
            // File not in the diff: hallucination.
            None => false,
            // Line beyond the diff range: hallucination. Line 0 (unknown)
            // is allowed through.
            Some(max) => d.line == 0 || d.line <= *max,
        })
        .collect()
}

/// Highest line number referenced by any hunk header, per file.
fn build_diff_line_map(diffs: &[FileDiff]) -> HashMap<&str, u32> {
    let mut map = HashMap::with_capacity(diffs.len());

    for diff in diffs {
        let mut max_line = 0;
        for line in diff.content.lines() {
            if let Some((start, count)) = parse_hunk_header(line) {
                max_line = max_line.max(start.saturating_add(count));
            }
        }
        if max_line == 0 {
            max_line = NO_HUNK_UPPER_BOUND;
        }
        map.insert(diff.path.as_str(), max_line);
    }

    map
}

/// Extract `(start, count)` from the `+` side of `@@ -a,b +c,d @@`.
/// A missing count means a single line.
fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    if !line.starts_with("@@ ") {
        return None;
    }

    let plus = line.find('+')?;
    let rest = &line[plus + 1..];
    let hunk = rest.split(' ').next().unwrap_or(rest);

    match hunk.split_once(',') {
        Some((start, count)) => {
            Some((start.parse().ok()?, count.parse().unwrap_or(1)))
        }
        None => Some((hunk.parse().ok()?, 1)),
    }
}
