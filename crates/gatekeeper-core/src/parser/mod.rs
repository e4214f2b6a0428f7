//! Output parsers: raw tool output in, structured diagnostics out.
//!
//! A parser is a pure function over `(stdout, stderr, exit_code)`. Every
//! parser is fail-closed: a non-zero exit with empty stdout is always a
//! failure with at least one diagnostic, so a tool that crashed before
//! emitting parseable output can never slip through as a pass.

mod generic;
mod gotest;
mod hints;
mod sarif;

use std::collections::HashMap;

use thiserror::Error;

use crate::report::Diagnostic;

pub use hints::enrich_hints;

/// Outcome of parsing one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Whether the tool run counts as passed.
    pub passed: bool,
    /// Structured issues extracted from the output.
    pub errors: Vec<Diagnostic>,
}

impl ParseResult {
    fn passed() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<Diagnostic>) -> Self {
        Self {
            passed: false,
            errors,
        }
    }
}

/// The bytes claimed to be a structured format but do not conform.
///
/// This is a system error, not a failing gate: the tool's verdict is unknown.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Stdout was not a valid SARIF document.
    #[error("parsing SARIF JSON: {0}")]
    Sarif(#[source] serde_json::Error),

    /// A line of the test event stream was not a valid event.
    #[error("parsing go test JSON output: line {line:?}: {source}")]
    TestEvent {
        /// The offending input line.
        line: String,
        /// The underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// A named output parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolParser {
    /// Exit-code-only fallback for tools without structured output.
    Generic,
    /// SARIF v2.1.0 JSON documents.
    Sarif,
    /// `go test -json` newline-delimited event streams.
    GoTest,
}

impl ToolParser {
    /// Parse raw tool output into a [`ParseResult`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] only when the output claims to be a structured
    /// format but does not conform. A tool that merely failed (non-zero
    /// exit) is a failed [`ParseResult`], not an error.
    pub fn parse(
        self,
        stdout: &[u8],
        stderr: &[u8],
        exit_code: i32,
    ) -> Result<ParseResult, ParseError> {
        match self {
            Self::Generic => Ok(generic::parse(stdout, stderr, exit_code)),
            Self::Sarif => sarif::parse(stdout, stderr, exit_code),
            Self::GoTest => gotest::parse(stdout, stderr, exit_code),
        }
    }
}

/// Case-sensitive name → parser lookup with a generic fallback.
///
/// Built once at setup; reads are lock-free because the map never changes
/// after construction.
#[derive(Debug, Clone)]
pub struct Registry {
    parsers: HashMap<String, ToolParser>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in parsers under their
    /// configuration names.
    #[must_use]
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register("sarif", ToolParser::Sarif);
        reg.register("go-test-json", ToolParser::GoTest);
        reg
    }

    /// Register a parser under a name. Later registrations win.
    pub fn register(&mut self, name: impl Into<String>, parser: ToolParser) {
        self.parsers.insert(name.into(), parser);
    }

    /// Look up a parser by name, falling back to [`ToolParser::Generic`].
    ///
    /// A miss on a non-empty name is a warning, not an error: the gate still
    /// runs, it just loses structured output.
    #[must_use]
    pub fn get_or_default(&self, name: &str) -> ToolParser {
        if name.is_empty() {
            return ToolParser::Generic;
        }
        match self.parsers.get(name) {
            Some(parser) => *parser,
            None => {
                tracing::warn!(parser = name, "unknown parser name, using generic");
                ToolParser::Generic
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shared fail-closed guard for structured parsers whose stdout is blank:
/// a non-zero exit is a hard failure carrying the trimmed stderr (or a
/// fallback message), and a zero exit is a plain pass.
fn empty_stdout_verdict(stderr: &[u8], exit_code: i32, tool: &str, fallback: &str) -> ParseResult {
    if exit_code == 0 {
        return ParseResult::passed();
    }

    let msg = String::from_utf8_lossy(stderr).trim().to_string();
    let msg = if msg.is_empty() {
        fallback.to_string()
    } else {
        msg
    };

    ParseResult::failed(vec![Diagnostic::error(msg, tool)])
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b.is_ascii_whitespace())
}
