//! Result model shared by parsers, gates, the engine, and formatters.
//!
//! A [`Diagnostic`] is one issue reported by any tool or reviewer. A
//! [`GateResult`] is the terminal outcome of one gate execution, and a
//! [`RunResult`] aggregates every gate of an invocation. The serde shape of
//! these types is the machine-readable output contract, so renames here are
//! wire-format changes.

use serde::{Deserialize, Serialize};

/// Issue severity reported by a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A finding that fails the gate.
    Error,
    /// A finding reported but not fatal on its own.
    Warning,
    /// Informational output.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single structured issue found by a parser or reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// File path relative to the project root. Empty when unknown.
    #[serde(default)]
    pub file: String,

    /// 1-based line number; 0 when unknown.
    #[serde(default)]
    pub line: u32,

    /// 1-based column number; 0 when unknown.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub column: u32,

    /// Issue severity.
    pub severity: Severity,

    /// Rule identifier, e.g. `gosec:G101`. Empty when the tool has none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rule: String,

    /// Human-readable description of the issue.
    pub message: String,

    /// Actionable remediation hint, if known.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hint: String,

    /// Name of the tool or reviewer that produced the issue.
    #[serde(default)]
    pub tool: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde skip_serializing_if signature
fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Diagnostic {
    /// Create a bare error diagnostic carrying only a message and tool name.
    pub fn error(message: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            file: String::new(),
            line: 0,
            column: 0,
            severity: Severity::Error,
            rule: String::new(),
            message: message.into(),
            hint: String::new(),
            tool: tool.into(),
        }
    }
}

/// Terminal outcome of one gate execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate name from configuration.
    pub name: String,

    /// Gate kind tag (`exec`, `script`, `llm`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether the gate passed.
    pub passed: bool,

    /// Whether a failure of this gate fails the whole run.
    pub blocking: bool,

    /// True when the gate was skipped without executing anything.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,

    /// Wall-clock execution time in milliseconds.
    pub duration_ms: u64,

    /// Structured issues found by the gate's parser or reviewer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Diagnostic>,

    /// Infrastructure failure (container setup, exec, parser, reviewer).
    /// Mutually exclusive with a normal pass/fail verdict: when set,
    /// `passed` is false and `errors` describes nothing the tool found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_error: Option<String>,

    /// Raw tool stdout, retained only in verbose mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl GateResult {
    /// True when this result should fail a run it participates in.
    #[must_use]
    pub fn blocks_run(&self) -> bool {
        self.blocking && (!self.passed || self.system_error.is_some())
    }
}

/// Aggregate outcome across all gates of one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    /// True iff every blocking gate passed without a system error.
    pub passed: bool,

    /// Wall-clock duration of the whole fan-out in milliseconds.
    pub duration_ms: u64,

    /// Per-gate results in configuration order.
    #[serde(default)]
    pub gates: Vec<GateResult>,
}
