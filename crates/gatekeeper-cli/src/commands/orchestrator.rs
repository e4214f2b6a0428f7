//! End-to-end pipeline orchestration with injected dependencies.
//!
//! Step order matters: the Docker pre-flight runs BEFORE the stash so a dead
//! daemon can never leave the repository in a stashed state, and the stash
//! pop runs on every exit path after it: normal completion, gate failure,
//! and interrupt signals (which bypass normal unwinding entirely, hence the
//! dedicated handler task).

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use gatekeeper_core::config::{self, GateConfig, GateKind, GlobalConfig, ProjectConfig};
use gatekeeper_core::engine::Engine;
use gatekeeper_core::filter;
use gatekeeper_core::format::ResultFormatter;
use gatekeeper_core::gate::Factory;
use gatekeeper_core::sandbox::{check_runtime, ContainerRuntime, Pool};
use gatekeeper_core::vcs::GitService;
use gatekeeper_core::PipelineError;
use tokio_util::sync::CancellationToken;

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct PipelineOpts {
    pub dry_run: bool,
    pub json: bool,
    pub verbose: bool,
    pub no_color: bool,
    pub fail_fast: bool,
    pub skip: Vec<String>,
    pub skip_llm: bool,
}

/// The full pipeline with injected collaborators, testable without real
/// infrastructure.
pub struct Pipeline {
    /// Stash, staged files, hooks, writable cleanup.
    pub git: Arc<dyn GitService>,

    /// Pre-flight ping target.
    pub runtime: Arc<dyn ContainerRuntime>,

    /// Shared warm-container pool (TTL eviction).
    pub pool: Arc<Pool>,

    /// Builds gate instances from configuration.
    pub factory: Factory,

    /// Parallel gate executor.
    pub engine: Engine,

    /// Pre-loaded user-level configuration.
    pub global: GlobalConfig,

    /// Path to `.gatekeeper/gates.yaml`.
    pub config_path: PathBuf,

    /// Primary output channel (formatted results).
    pub stdout: Box<dyn Write + Send>,

    /// Side channel (progress, warnings).
    pub stderr: Box<dyn Write + Send>,
}

impl Pipeline {
    /// Run the whole pipeline: config → preflight → stash → filter → run →
    /// cleanup → format → restore.
    ///
    /// # Errors
    ///
    /// System-level failures propagate as their typed variants;
    /// [`PipelineError::GatesFailed`] signals a failed verdict (unless
    /// `dry_run`).
    pub async fn execute(
        &mut self,
        cancel: &CancellationToken,
        opts: PipelineOpts,
    ) -> Result<(), PipelineError> {
        let operation = if opts.dry_run { "dry-run" } else { "run" };
        tracing::info!(operation, "gatekeeper pipeline started");

        // 1. Project configuration.
        let cfg = config::load_project_config(&self.config_path)?;

        // 2. Docker pre-flight, strictly before the stash.
        check_runtime(self.runtime.as_ref()).await?;

        // Lazy TTL eviction: clear idle containers before acquiring new
        // ones. Best-effort.
        if let Err(err) = self.pool.evict_stale(self.global.container_ttl).await {
            tracing::warn!(error = %err, "stale container eviction failed");
        }

        // 3. Isolate the staged snapshot.
        let stashed = self.git.stash().await?;

        // Deferred cleanup does not run on SIGINT/SIGTERM, so a dedicated
        // handler restores the stash and terminates. Registered only after
        // a successful stash; aborted on the normal path to avoid a
        // double pop.
        let signal_guard = if stashed {
            Some(spawn_signal_restorer(Arc::clone(&self.git)))
        } else {
            None
        };

        let outcome = self.run_gates(cancel, cfg, &opts).await;

        if let Some(guard) = signal_guard {
            guard.abort();
        }
        if stashed {
            if let Err(err) = self.git.stash_pop().await {
                // Do not alter the exit status: the verdict already stands
                // and the stash is still recoverable by hand.
                tracing::error!(error = %err, "failed to restore stash");
                let _ = writeln!(
                    self.stderr,
                    "⚠️  failed to restore stashed changes: {err}\n   Your changes are safe — run 'git stash pop' manually."
                );
            }
        }

        outcome
    }

    async fn run_gates(
        &mut self,
        cancel: &CancellationToken,
        cfg: ProjectConfig,
        opts: &PipelineOpts,
    ) -> Result<(), PipelineError> {
        // 4. Staged files for filtering.
        let staged_files = self.git.staged_files().await?;

        // 5. CLI skip filters, then per-gate file filters.
        let gates = filter_skipped_gates(cfg.gates, &opts.skip, opts.skip_llm);
        let gates = filter::filter_gates(gates, &staged_files);

        if gates.is_empty() {
            let _ = writeln!(self.stderr, "✅ No gates to run");
            return Ok(());
        }

        let any_writable = gates.iter().any(|g| g.writable);

        // 6. Build and run.
        let instances = self.factory.create_all(gates)?;
        let fail_fast = opts.fail_fast || cfg.defaults.fail_fast;
        let mut result = self.engine.run_all(cancel, instances, fail_fast).await;

        // 7. Writable gates may have dirtied the tree; discard their
        // modifications before the user's own changes come back.
        if any_writable {
            if let Err(err) = self.git.clean_writable_files().await {
                tracing::error!(error = %err, "failed to clean writable files");
            }
        }

        // 8. Render. Raw output is retained only in verbose mode.
        if !opts.verbose {
            for gate in &mut result.gates {
                gate.raw_output = None;
            }
        }

        let formatter = if opts.json {
            ResultFormatter::Json
        } else {
            ResultFormatter::Human {
                color: !opts.no_color && self.global.color(),
                verbose: opts.verbose || self.global.verbose(),
            }
        };
        let _ = write!(self.stdout, "{}", formatter.format(&result));
        let _ = self.stdout.flush();

        // 9. Verdict.
        if opts.dry_run {
            return Ok(());
        }
        if !result.passed {
            return Err(PipelineError::GatesFailed);
        }
        Ok(())
    }
}

/// Remove gates matching `--skip` names or, with `skip_llm`, the llm kind.
pub(crate) fn filter_skipped_gates(
    gates: Vec<GateConfig>,
    skip: &[String],
    skip_llm: bool,
) -> Vec<GateConfig> {
    if skip.is_empty() && !skip_llm {
        return gates;
    }

    gates
        .into_iter()
        .filter(|g| !skip.contains(&g.name))
        .filter(|g| !(skip_llm && g.kind == Some(GateKind::Llm)))
        .collect()
}

/// Restore the stash and terminate when an interrupt arrives. Runs detached;
/// the caller aborts it on the normal exit path.
fn spawn_signal_restorer(git: Arc<dyn GitService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let (Ok(mut sigint), Ok(mut sigterm)) = (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) else {
            tracing::warn!("could not register signal handlers; stash will not be restored on interrupt");
            return;
        };

        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }

        tracing::info!("signal received, restoring stash");
        if let Err(err) = git.stash_pop().await {
            eprintln!(
                "⚠️  failed to restore stashed changes: {err}\n   Your changes are safe — run 'git stash pop' manually."
            );
        }
        std::process::exit(1);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(name: &str, kind: GateKind) -> GateConfig {
        GateConfig {
            name: name.into(),
            kind: Some(kind),
            ..GateConfig::default()
        }
    }

    #[test]
    fn no_filters_keeps_everything() {
        let gates = vec![gate("lint", GateKind::Exec), gate("ai", GateKind::Llm)];
        let kept = filter_skipped_gates(gates, &[], false);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn skip_by_name_removes_named_gates() {
        let gates = vec![
            gate("lint", GateKind::Exec),
            gate("test", GateKind::Exec),
            gate("vet", GateKind::Exec),
        ];
        let kept = filter_skipped_gates(gates, &["lint".into(), "vet".into()], false);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "test");
    }

    #[test]
    fn skip_llm_removes_only_llm_gates() {
        let gates = vec![gate("lint", GateKind::Exec), gate("ai", GateKind::Llm)];
        let kept = filter_skipped_gates(gates, &[], true);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "lint");
    }

    #[test]
    fn skip_filters_combine() {
        let gates = vec![
            gate("lint", GateKind::Exec),
            gate("test", GateKind::Exec),
            gate("ai", GateKind::Llm),
        ];
        let kept = filter_skipped_gates(gates, &["lint".into()], true);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "test");
    }
}
