//! LLM-powered review of staged diffs.
//!
//! The [`ReviewClient`] port sends a prompt and returns structured
//! diagnostics. Retries, the per-request timeout, and the structured-output
//! request mode are the port's concern; line-number validation
//! ([`validate_line_numbers`]) happens on the gate side because it needs the
//! diffs.

mod gemini;
mod prompt;
mod validate;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::report::Diagnostic;

pub use gemini::GeminiClient;
pub use prompt::build_prompt;
pub use validate::validate_line_numbers;

/// Review failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewError {
    /// Every attempt failed; carries the last transport failure.
    #[error("LLM review failed after {attempts} attempts: {last}")]
    Exhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The last failure message.
        last: String,
    },

    /// The provider returned no usable content.
    #[error("empty response from LLM provider")]
    EmptyResponse,

    /// The response text was not a diagnostics array.
    #[error("parsing LLM response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// Cancelled between retries.
    #[error("LLM review cancelled")]
    Cancelled,
}

/// Abstracts the LLM provider for testability.
#[async_trait]
pub trait ReviewClient: Send + Sync {
    /// Send a review prompt and return the reported diagnostics.
    async fn review(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Vec<Diagnostic>, ReviewError>;
}
