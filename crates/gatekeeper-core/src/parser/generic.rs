//! Fallback parser for tools without structured output.
//!
//! The verdict is the exit code alone. On failure the single diagnostic
//! carries stderr, falling back to stdout, falling back to a generic message.

use crate::report::Diagnostic;

use super::ParseResult;

pub(super) fn parse(stdout: &[u8], stderr: &[u8], exit_code: i32) -> ParseResult {
    if exit_code == 0 {
        return ParseResult::passed();
    }

    let mut msg = String::from_utf8_lossy(stderr).trim().to_string();
    if msg.is_empty() {
        msg = String::from_utf8_lossy(stdout).trim().to_string();
    }
    if msg.is_empty() {
        msg = "Tool failed with no output".to_string();
    }

    ParseResult::failed(vec![Diagnostic::error(msg, "generic")])
}
