//! Container-bound gate: run a command or script in a pooled container and
//! parse the output.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::{GateConfig, GateKind};
use crate::parser::{enrich_hints, ToolParser};
use crate::report::GateResult;
use crate::sandbox::{ExecError, Executor, Pool};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gate that executes inside a Docker container.
pub struct ContainerGate {
    cfg: GateConfig,
    pool: Arc<Pool>,
    executor: Arc<Executor>,
    parser: ToolParser,
    project: PathBuf,
}

impl ContainerGate {
    /// Create a container gate.
    #[must_use]
    pub fn new(
        cfg: GateConfig,
        pool: Arc<Pool>,
        executor: Arc<Executor>,
        parser: ToolParser,
        project: PathBuf,
    ) -> Self {
        Self {
            cfg,
            pool,
            executor,
            parser,
            project,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.cfg.name
    }

    pub(crate) async fn execute(&self, cancel: &CancellationToken) -> Option<GateResult> {
        tracing::info!(gate = %self.cfg.name, kind = self.cfg.kind_str(), "container gate started");
        let start = Instant::now();

        let mut result = GateResult {
            name: self.cfg.name.clone(),
            kind: self.cfg.kind_str().to_string(),
            blocking: self.cfg.is_blocking(),
            ..GateResult::default()
        };

        let container_id = match self
            .pool
            .acquire(&self.cfg.container, &self.project, self.cfg.writable)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                result.system_error = Some(format!("container setup failed: {err}"));
                result.duration_ms = elapsed_ms(start);
                return Some(result);
            }
        };

        let command = self.build_command();
        let timeout = self.cfg.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let outcome = match self.executor.run(cancel, &container_id, &command, timeout).await {
            Ok(outcome) => outcome,
            Err(ExecError::Cancelled) => return None,
            Err(err) => {
                result.system_error = Some(format!("execution failed: {err}"));
                result.duration_ms = elapsed_ms(start);
                return Some(result);
            }
        };

        result.raw_output = Some(String::from_utf8_lossy(&outcome.stdout).into_owned());

        match self
            .parser
            .parse(&outcome.stdout, &outcome.stderr, outcome.exit_code)
        {
            Ok(parsed) => {
                result.passed = parsed.passed;
                result.errors = parsed.errors;
                enrich_hints(&mut result.errors);
            }
            Err(err) => {
                result.system_error = Some(format!("parser error: {err}"));
            }
        }

        result.duration_ms = elapsed_ms(start);
        tracing::info!(
            gate = %self.cfg.name,
            passed = result.passed,
            duration_ms = result.duration_ms,
            "container gate completed"
        );
        Some(result)
    }

    /// Build the in-container command line. Script paths are single-quoted
    /// (the config validator additionally rejects paths containing a quote).
    fn build_command(&self) -> String {
        match self.cfg.kind {
            Some(GateKind::Script) => format!("sh {}", shell_quote(&self.cfg.path)),
            _ => self.cfg.command.clone(),
        }
    }
}

/// Single-quote a string for `sh -c`, escaping embedded quotes with the
/// standard `'\''` sequence.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
