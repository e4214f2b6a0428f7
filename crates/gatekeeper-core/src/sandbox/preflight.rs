//! Docker availability pre-flight check.
//!
//! Runs before any stash so a missing daemon never leaves the working tree
//! in a stashed state. Failures are classified into actionable hints.

use crate::error::PipelineError;

use super::ContainerRuntime;

/// Verify the container engine is reachable.
///
/// # Errors
///
/// [`PipelineError::SandboxUnavailable`] with a classified hint.
pub async fn check_runtime(runtime: &dyn ContainerRuntime) -> Result<(), PipelineError> {
    match runtime.ping().await {
        Ok(()) => Ok(()),
        Err(source) => Err(PipelineError::SandboxUnavailable {
            hint: classify(&source.to_string()),
            source,
        }),
    }
}

fn classify(message: &str) -> String {
    let msg = message.to_ascii_lowercase();

    let hint = if msg.contains("permission denied") {
        "Docker permission denied. Run: sudo usermod -aG docker $USER, then re-login."
    } else if msg.contains("connection refused") || msg.contains("cannot connect") {
        "Docker is not running. Start it with: sudo systemctl start docker"
    } else {
        // Covers "no such file or directory", "not found", and anything we
        // cannot classify more precisely.
        "Docker is required but not found. Install it from https://docker.com"
    };
    hint.to_string()
}
