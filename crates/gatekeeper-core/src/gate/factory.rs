//! Gate construction from configuration.
//!
//! The factory is the composition seam: it owns the shared pool, executor,
//! parser registry, git service, and (optionally) the LLM client, and injects
//! them into each gate it builds.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{GateConfig, GateKind};
use crate::error::PipelineError;
use crate::llm::ReviewClient;
use crate::parser::Registry;
use crate::sandbox::{Executor, Pool};
use crate::vcs::GitService;

use super::{ContainerGate, Gate, ReviewGate};

/// Builds [`Gate`] values from configuration entries.
pub struct Factory {
    pool: Arc<Pool>,
    executor: Arc<Executor>,
    registry: Registry,
    llm: Option<Arc<dyn ReviewClient>>,
    git: Arc<dyn GitService>,
    project: PathBuf,
}

impl Factory {
    /// Create a factory. `llm` may be `None` when no credential is
    /// configured; building an llm gate then fails with a pointer to the
    /// credential settings.
    #[must_use]
    pub fn new(
        pool: Arc<Pool>,
        executor: Arc<Executor>,
        registry: Registry,
        llm: Option<Arc<dyn ReviewClient>>,
        git: Arc<dyn GitService>,
        project: PathBuf,
    ) -> Self {
        Self {
            pool,
            executor,
            registry,
            llm,
            git,
            project,
        }
    }

    /// Build one gate.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ConfigInvalid`] for an llm gate without a configured
    /// client. Unknown kinds cannot reach here; config validation rejects
    /// them.
    pub fn create(&self, cfg: GateConfig) -> Result<Gate, PipelineError> {
        match cfg.kind {
            Some(GateKind::Exec | GateKind::Script) => {
                let parser = self.registry.get_or_default(&cfg.parser);
                Ok(Gate::Container(ContainerGate::new(
                    cfg,
                    Arc::clone(&self.pool),
                    Arc::clone(&self.executor),
                    parser,
                    self.project.clone(),
                )))
            }
            Some(GateKind::Llm) => {
                let Some(client) = &self.llm else {
                    return Err(PipelineError::invalid_config(format!(
                        "gate {:?} requires an LLM client but none is configured — \
                         set GATEKEEPER_GEMINI_KEY or add to ~/.config/gatekeeper/config.yaml",
                        cfg.name
                    )));
                };
                Ok(Gate::Review(ReviewGate::new(
                    cfg,
                    Arc::clone(client),
                    Arc::clone(&self.git),
                )))
            }
            None => Err(PipelineError::invalid_config(format!(
                "gate {:?}: missing required field 'type'",
                cfg.name
            ))),
        }
    }

    /// Build every gate, preserving order.
    ///
    /// # Errors
    ///
    /// Fails on the first gate that cannot be built.
    pub fn create_all(&self, configs: Vec<GateConfig>) -> Result<Vec<Gate>, PipelineError> {
        configs.into_iter().map(|cfg| self.create(cfg)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Diagnostic;
    use crate::sandbox::{
        ContainerRuntime, ContainerSpec, ContainerSummary, ExecSession, RuntimeError,
    };
    use crate::vcs::{FileDiff, VcsError};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct NullRuntime;

    #[async_trait]
    impl ContainerRuntime for NullRuntime {
        async fn ping(&self) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn pull_image(&self, _: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn create_container(&self, _: &ContainerSpec) -> Result<String, RuntimeError> {
            Ok("c".into())
        }
        async fn start_container(&self, _: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn list_containers(
            &self,
            _: &[(String, String)],
            _: bool,
        ) -> Result<Vec<ContainerSummary>, RuntimeError> {
            Ok(Vec::new())
        }
        async fn remove_container(&self, _: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn exec(&self, _: &str, _: &[String]) -> Result<ExecSession, RuntimeError> {
            unreachable!()
        }
    }

    struct NullGit;

    #[async_trait]
    impl GitService for NullGit {
        async fn staged_diff(&self) -> Result<Vec<FileDiff>, VcsError> {
            Ok(Vec::new())
        }
        async fn staged_files(&self) -> Result<Vec<String>, VcsError> {
            Ok(Vec::new())
        }
        async fn stash(&self) -> Result<bool, VcsError> {
            Ok(false)
        }
        async fn stash_pop(&self) -> Result<(), VcsError> {
            Ok(())
        }
        async fn clean_writable_files(&self) -> Result<(), VcsError> {
            Ok(())
        }
        async fn install_hook(&self) -> Result<(), VcsError> {
            Ok(())
        }
        async fn remove_hook(&self) -> Result<(), VcsError> {
            Ok(())
        }
    }

    struct NullReviewer;

    #[async_trait]
    impl crate::llm::ReviewClient for NullReviewer {
        async fn review(
            &self,
            _: &CancellationToken,
            _: &str,
        ) -> Result<Vec<Diagnostic>, crate::llm::ReviewError> {
            Ok(Vec::new())
        }
    }

    fn factory(with_llm: bool) -> Factory {
        let runtime = Arc::new(NullRuntime);
        Factory::new(
            Arc::new(Pool::new(runtime.clone())),
            Arc::new(Executor::new(runtime)),
            Registry::builtin(),
            with_llm.then(|| Arc::new(NullReviewer) as Arc<dyn ReviewClient>),
            Arc::new(NullGit),
            PathBuf::from("/project"),
        )
    }

    fn cfg(name: &str, kind: GateKind) -> GateConfig {
        GateConfig {
            name: name.into(),
            kind: Some(kind),
            command: "true".into(),
            path: "check.sh".into(),
            provider: "gemini".into(),
            prompt: "review".into(),
            ..GateConfig::default()
        }
    }

    #[test]
    fn builds_container_gates_for_exec_and_script() {
        let factory = factory(false);
        assert!(matches!(
            factory.create(cfg("a", GateKind::Exec)).unwrap(),
            Gate::Container(_)
        ));
        assert!(matches!(
            factory.create(cfg("b", GateKind::Script)).unwrap(),
            Gate::Container(_)
        ));
    }

    #[test]
    fn builds_review_gate_when_client_available() {
        let factory = factory(true);
        assert!(matches!(
            factory.create(cfg("ai", GateKind::Llm)).unwrap(),
            Gate::Review(_)
        ));
    }

    #[test]
    fn llm_gate_without_client_names_the_credential() {
        let factory = factory(false);
        let err = factory.create(cfg("ai", GateKind::Llm)).unwrap_err();
        assert!(err.to_string().contains("GATEKEEPER_GEMINI_KEY"));
    }

    #[test]
    fn create_all_preserves_order() {
        let factory = factory(true);
        let gates = factory
            .create_all(vec![
                cfg("one", GateKind::Exec),
                cfg("two", GateKind::Llm),
                cfg("three", GateKind::Script),
            ])
            .unwrap();
        let names: Vec<&str> = gates.iter().map(Gate::name).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }
}
