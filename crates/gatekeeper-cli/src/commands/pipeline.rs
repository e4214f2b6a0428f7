//! Composition root for `run` and `dry-run`: wires real infrastructure and
//! delegates to [`Pipeline::execute`].

use std::sync::Arc;

use anyhow::{Context, Result};
use gatekeeper_core::config::GlobalConfig;
use gatekeeper_core::engine::{Engine, Progress};
use gatekeeper_core::gate::Factory;
use gatekeeper_core::llm::{GeminiClient, ReviewClient};
use gatekeeper_core::parser::Registry;
use gatekeeper_core::sandbox::{ContainerRuntime, DockerCli, Executor, Pool};
use gatekeeper_core::vcs::{GitCli, GitService};
use tokio_util::sync::CancellationToken;

use super::{Flags, Pipeline, PipelineOpts};

/// Execute the gate pipeline against the current working directory.
pub async fn run(flags: &Flags, dry_run: bool) -> Result<()> {
    let project_dir = std::env::current_dir().context("getting working directory")?;

    let global = GlobalConfig::load(&|key| std::env::var(key).ok())
        .map_err(anyhow::Error::msg)
        .context("loading global config")?;

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::new());
    let pool = Arc::new(Pool::new(Arc::clone(&runtime)));
    let executor = Arc::new(Executor::new(Arc::clone(&runtime)));
    let git: Arc<dyn GitService> = Arc::new(GitCli::new(&project_dir));

    let llm: Option<Arc<dyn ReviewClient>> = global
        .gemini_api_key
        .clone()
        .map(|key| Arc::new(GeminiClient::new(key, "")) as Arc<dyn ReviewClient>);

    let factory = Factory::new(
        Arc::clone(&pool),
        executor,
        Registry::builtin(),
        llm,
        Arc::clone(&git),
        project_dir.clone(),
    );

    let progress = Arc::new(Progress::stderr(flags.json, 0));
    let engine = Engine::with_progress(progress);

    let mut pipeline = Pipeline {
        git,
        runtime,
        pool,
        factory,
        engine,
        global,
        config_path: project_dir.join(".gatekeeper").join("gates.yaml"),
        stdout: Box::new(std::io::stdout()),
        stderr: Box::new(std::io::stderr()),
    };

    let opts = PipelineOpts {
        dry_run,
        json: flags.json,
        verbose: flags.verbose,
        no_color: flags.no_color,
        fail_fast: flags.fail_fast,
        skip: flags.skip.clone(),
        skip_llm: flags.skip_llm,
    };

    pipeline
        .execute(&CancellationToken::new(), opts)
        .await
        .map_err(Into::into)
}
