//! Pipeline error taxonomy.
//!
//! A failing gate is not an error: that verdict travels inside
//! [`GateResult`](crate::report::GateResult). This enum covers system-level
//! failures plus the [`PipelineError::GatesFailed`] sentinel that callers map
//! to a deterministic non-zero exit without logging a crash.

use thiserror::Error;

use crate::sandbox::RuntimeError;
use crate::vcs::VcsError;

/// Top-level error for the orchestration pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// No project configuration file exists.
    #[error("no .gatekeeper/gates.yaml found. Run 'gatekeeper init' first")]
    ConfigMissing,

    /// The configuration file could not be parsed or failed validation.
    /// Carries every per-gate problem so users can fix all of them at once.
    #[error("invalid configuration:\n  {}", messages.join("\n  "))]
    ConfigInvalid {
        /// One message per validation failure.
        messages: Vec<String>,
    },

    /// The container runtime pre-flight check failed. The hint is shown to
    /// the user verbatim; the cause carries the underlying failure.
    #[error("{hint}")]
    SandboxUnavailable {
        /// Actionable, classified remediation hint.
        hint: String,
        /// The underlying runtime failure.
        #[source]
        source: RuntimeError,
    },

    /// A git operation (stash, diff, hook) failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Sentinel: one or more blocking gates failed. Not a transport error,
    /// so callers exit non-zero without printing a stack trace.
    #[error("one or more blocking gates failed")]
    GatesFailed,

    /// The run was cancelled by an interrupt or the caller.
    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Build a [`PipelineError::ConfigInvalid`] from a single message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            messages: vec![message.into()],
        }
    }
}
