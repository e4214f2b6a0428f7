//! `teardown`: remove the pre-commit hook, keep the configuration.

use anyhow::{Context, Result};
use gatekeeper_core::vcs::{GitCli, GitService};

/// Remove the gatekeeper pre-commit hook.
pub async fn run() -> Result<()> {
    tracing::info!("teardown started");

    let project_dir = std::env::current_dir().context("getting working directory")?;
    let git = GitCli::new(&project_dir);
    git.remove_hook().await?;

    println!("🔓 Gatekeeper pre-commit hook removed");
    tracing::info!("teardown completed");
    Ok(())
}
