//! LLM review gate: staged diffs in, validated diagnostics out.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::GateConfig;
use crate::llm::{build_prompt, validate_line_numbers, ReviewClient, ReviewError};
use crate::report::GateResult;
use crate::vcs::{filter_by_size, GitService};

/// Gate that sends staged diffs to an LLM reviewer.
pub struct ReviewGate {
    cfg: GateConfig,
    client: Arc<dyn ReviewClient>,
    git: Arc<dyn GitService>,
}

impl ReviewGate {
    /// Create a review gate.
    #[must_use]
    pub fn new(cfg: GateConfig, client: Arc<dyn ReviewClient>, git: Arc<dyn GitService>) -> Self {
        Self { cfg, client, git }
    }

    pub(crate) fn name(&self) -> &str {
        &self.cfg.name
    }

    pub(crate) async fn execute(&self, cancel: &CancellationToken) -> Option<GateResult> {
        tracing::info!(gate = %self.cfg.name, provider = %self.cfg.provider, "review gate started");
        let start = Instant::now();

        let mut result = GateResult {
            name: self.cfg.name.clone(),
            kind: self.cfg.kind_str().to_string(),
            blocking: self.cfg.is_blocking(),
            ..GateResult::default()
        };

        let diffs = match self.git.staged_diff().await {
            Ok(diffs) => diffs,
            Err(err) => {
                result.system_error = Some(format!("failed to get staged diffs: {err}"));
                result.duration_ms = elapsed_ms(start);
                return Some(result);
            }
        };

        if diffs.is_empty() {
            result.passed = true;
            result.duration_ms = elapsed_ms(start);
            tracing::info!(gate = %self.cfg.name, "review gate skipped — no staged diffs");
            return Some(result);
        }

        let (included, skipped) = filter_by_size(diffs, self.cfg.max_file_size_bytes());
        if !skipped.is_empty() {
            tracing::debug!(
                gate = %self.cfg.name,
                skipped = skipped.len(),
                "diffs over the size limit excluded from review"
            );
        }

        if included.is_empty() {
            result.passed = true;
            result.duration_ms = elapsed_ms(start);
            tracing::info!(gate = %self.cfg.name, "review gate skipped — all files exceed size limit");
            return Some(result);
        }

        let prompt = build_prompt(&self.cfg.prompt, "", &included);

        let reported = match self.client.review(cancel, &prompt).await {
            Ok(reported) => reported,
            Err(ReviewError::Cancelled) => return None,
            Err(err) => {
                result.system_error = Some(format!("LLM review failed: {err}"));
                result.duration_ms = elapsed_ms(start);
                return Some(result);
            }
        };

        let mut validated = validate_line_numbers(reported, &included);
        for diag in &mut validated {
            diag.tool = self.cfg.provider.clone();
        }

        result.passed = validated.is_empty();
        result.errors = validated;
        result.duration_ms = elapsed_ms(start);

        tracing::info!(
            gate = %self.cfg.name,
            passed = result.passed,
            issues = result.errors.len(),
            duration_ms = result.duration_ms,
            "review gate completed"
        );
        Some(result)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
