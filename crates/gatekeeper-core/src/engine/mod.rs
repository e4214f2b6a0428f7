//! Parallel gate execution engine.
//!
//! The engine is the sole concurrency producer in the system: one task per
//! gate, all sharing a child cancellation token rooted at the caller's. On
//! fail-fast, the first blocking failure cancels the child token; in-flight
//! gates observe it at their suspension points and their slots stay empty.
//! Results are collected back into configuration order regardless of
//! completion order.

mod progress;

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::gate::Gate;
use crate::report::RunResult;

pub use progress::Progress;

/// Fan-out/fan-in executor for a configured gate list.
#[derive(Default)]
pub struct Engine {
    progress: Option<Arc<Progress>>,
}

impl Engine {
    /// Create an engine without progress reporting.
    #[must_use]
    pub fn new() -> Self {
        Self { progress: None }
    }

    /// Create an engine that reports progress.
    #[must_use]
    pub fn with_progress(progress: Arc<Progress>) -> Self {
        Self {
            progress: Some(progress),
        }
    }

    /// Run every gate in parallel and aggregate the verdict.
    ///
    /// With `fail_fast`, the first blocking failure cancels the remaining
    /// gates; their slots are omitted from the output (they are not counted
    /// as passed; the run already failed through the triggering gate).
    pub async fn run_all(
        &self,
        cancel: &CancellationToken,
        gates: Vec<Gate>,
        fail_fast: bool,
    ) -> RunResult {
        tracing::info!(gates = gates.len(), fail_fast, "engine run started");
        let start = Instant::now();

        if gates.is_empty() {
            return RunResult {
                passed: true,
                duration_ms: 0,
                gates: Vec::new(),
            };
        }

        let child = cancel.child_token();
        let total = gates.len();

        let mut handles = Vec::with_capacity(total);
        for (idx, gate) in gates.into_iter().enumerate() {
            let token = child.clone();
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                // A fail-fast victim that never started leaves its slot
                // empty.
                if token.is_cancelled() {
                    return (idx, None);
                }

                if let Some(progress) = &progress {
                    progress.on_start(gate.name());
                }

                let result = gate.execute(&token).await;

                if let Some(result) = &result {
                    if let Some(progress) = &progress {
                        progress.on_complete(result);
                    }

                    if fail_fast && result.blocks_run() {
                        tracing::info!(failed_gate = %result.name, "fail-fast: cancelling remaining gates");
                        token.cancel();
                    }
                }

                (idx, result)
            }));
        }

        let mut slots: Vec<Option<crate::report::GateResult>> =
            std::iter::repeat_with(|| None).take(total).collect();
        for handle in handles {
            if let Ok((idx, result)) = handle.await {
                slots[idx] = result;
            }
        }

        let mut run = RunResult {
            passed: true,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            gates: Vec::new(),
        };

        for result in slots.into_iter().flatten() {
            if result.blocks_run() {
                run.passed = false;
            }
            run.gates.push(result);
        }

        if let Some(progress) = &self.progress {
            progress.finish();
        }

        tracing::info!(
            passed = run.passed,
            duration_ms = run.duration_ms,
            gates_run = run.gates.len(),
            "engine run completed"
        );
        run
    }
}
