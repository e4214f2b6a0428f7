//! Review prompt construction.

use std::fmt::Write;

use crate::vcs::FileDiff;

/// Build the review prompt from the configured rules, a language hint, and
/// the staged per-file diffs.
#[must_use]
pub fn build_prompt(user_prompt: &str, language: &str, diffs: &[FileDiff]) -> String {
    let language = if language.is_empty() {
        "auto-detect"
    } else {
        language
    };

    let mut diff_content = String::new();
    for diff in diffs {
        let _ = writeln!(diff_content, "--- {} ---\n{}\n", diff.path, diff.content);
    }

    format!(
        "You are a code reviewer for a pre-commit hook. Review the following diff and identify issues. \
         Respond ONLY with a JSON array matching the required schema.\n\
         If no issues, return: []\n\n\
         Review rules: {user_prompt}\n\
         Language: {language}\n\n\
         {diff_content}"
    )
}
