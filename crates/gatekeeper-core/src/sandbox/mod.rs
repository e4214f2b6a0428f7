//! Container sandbox management: runtime port, warm pool, and executor.
//!
//! The [`ContainerRuntime`] trait is the only path to the container engine.
//! Production code uses [`DockerCli`]; tests use in-memory mocks. The
//! [`Pool`] reuses long-lived containers keyed by
//! `(image, project path, writable)`, and the [`Executor`] runs commands
//! inside them with demultiplexed output capture and a timeout.

mod docker;
mod executor;
mod pool;
mod preflight;

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub use docker::DockerCli;
pub use executor::{ExecError, ExecOutcome, Executor};
pub use pool::{
    Pool, LABEL_IMAGE, LABEL_LAST_USED, LABEL_MANAGED, LABEL_POOL_KEY, LABEL_PROJECT,
    LABEL_WRITABLE,
};
pub use preflight::check_runtime;

/// Container runtime failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// The runtime binary could not be launched at all.
    #[error("launching docker: {0}")]
    Spawn(#[source] std::io::Error),

    /// A runtime operation exited non-zero.
    #[error("docker {context} failed: {stderr}")]
    Command {
        /// Which operation failed (`ping`, `pull`, `create`, ...).
        context: String,
        /// Trimmed stderr from the runtime.
        stderr: String,
    },

    /// Reading from the runtime's output stream failed.
    #[error("reading docker output: {0}")]
    Stream(#[source] std::io::Error),
}

/// Everything needed to create one pooled container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Image reference.
    pub image: String,

    /// Entrypoint argv that keeps the container alive (`sleep infinity`).
    pub entrypoint: Vec<String>,

    /// Working directory inside the container.
    pub working_dir: String,

    /// Labels identifying the container as pool-managed.
    pub labels: Vec<(String, String)>,

    /// Host project directory bind-mounted at the working directory.
    pub project_dir: PathBuf,

    /// Mount the project read-write instead of read-only.
    pub writable: bool,

    /// `uid:gid` to run as; required for writable mounts.
    pub user: Option<String>,
}

/// Summary of one existing container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    /// Container identifier.
    pub id: String,
    /// Container labels.
    pub labels: HashMap<String, String>,
}

/// One chunk of exec output, tagged with its originating stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    /// Bytes written to stdout.
    Stdout(Vec<u8>),
    /// Bytes written to stderr.
    Stderr(Vec<u8>),
}

/// A running exec: a stream of tagged output chunks plus the eventual exit
/// code. The channel closes when both streams reach EOF.
#[derive(Debug)]
pub struct ExecSession {
    /// Interleaved, stream-tagged output.
    pub output: mpsc::Receiver<OutputChunk>,
    /// Resolves once the process exits.
    pub exit: oneshot::Receiver<Result<i32, RuntimeError>>,
}

/// Abstracts the container engine for testability. Production code uses
/// [`DockerCli`]; tests use mocks.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check the engine is available and responsive.
    async fn ping(&self) -> Result<(), RuntimeError>;

    /// Pull an image, returning only after the pull has fully completed.
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

    /// Create a container, returning its identifier.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Start a created container.
    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// List containers matching every given `label=value` filter.
    async fn list_containers(
        &self,
        label_filters: &[(String, String)],
        running_only: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// Force-remove a container.
    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Start an exec process (non-TTY) inside a running container and attach
    /// to its output streams.
    async fn exec(&self, container_id: &str, argv: &[String]) -> Result<ExecSession, RuntimeError>;
}
