//! Result rendering: human CLI report or machine-readable JSON.
//!
//! The formatter writes to stdout only; progress and warnings go to stderr
//! elsewhere. Gates are rendered in the order they appear in the result,
//! which the engine guarantees is configuration order.

mod human;
mod json;

use crate::report::RunResult;

/// Output renderer selected by the CLI flags.
#[derive(Debug, Clone, Copy)]
pub enum ResultFormatter {
    /// Human-readable report with optional ANSI color.
    Human {
        /// Emit ANSI color codes.
        color: bool,
        /// Include raw tool output.
        verbose: bool,
    },
    /// Pretty-printed JSON with the stable machine shape.
    Json,
}

impl ResultFormatter {
    /// Render the aggregate result.
    #[must_use]
    pub fn format(self, result: &RunResult) -> String {
        match self {
            Self::Human { color, verbose } => human::render(result, color, verbose),
            Self::Json => json::render(result),
        }
    }
}
