//! `cleanup`: remove every gatekeeper-managed container.

use std::sync::Arc;

use anyhow::{Context, Result};
use gatekeeper_core::sandbox::{DockerCli, Pool};

/// Stop and remove all managed containers.
pub async fn run() -> Result<()> {
    tracing::info!("cleanup started");

    let pool = Pool::new(Arc::new(DockerCli::new()));
    let removed = pool.evict_all().await.context("cleanup failed")?;

    println!("♻️  Removed {removed} gatekeeper container(s)");
    tracing::info!(removed, "cleanup completed");
    Ok(())
}
