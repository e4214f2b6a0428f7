//! Command execution inside pooled containers.
//!
//! Commands are wrapped in `sh -c` so pipes, redirects, and quoting behave
//! the way gate authors expect. The runtime delivers a single stream of
//! tagged chunks; the executor demultiplexes it into separate stdout and
//! stderr buffers while racing cancellation and the per-gate timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{ContainerRuntime, OutputChunk, RuntimeError};

/// Execution failure. Timeouts and cancellation are distinct from runtime
/// faults so callers can report them precisely.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecError {
    /// The runtime failed to create or attach the exec.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The command exceeded its timeout.
    #[error("command timed out after {}s", timeout.as_secs())]
    TimedOut {
        /// The configured limit.
        timeout: Duration,
    },

    /// The run was cancelled.
    #[error("execution cancelled")]
    Cancelled,
}

/// Captured output of one exec.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Demultiplexed stdout bytes.
    pub stdout: Vec<u8>,
    /// Demultiplexed stderr bytes.
    pub stderr: Vec<u8>,
    /// Process exit code.
    pub exit_code: i32,
    /// Wall-clock execution time.
    pub duration: Duration,
}

/// Runs commands inside running containers.
pub struct Executor {
    runtime: Arc<dyn ContainerRuntime>,
}

impl Executor {
    /// Create an executor over the given runtime.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Execute `command` via `sh -c` inside `container_id`.
    ///
    /// # Errors
    ///
    /// [`ExecError::TimedOut`] when the timeout elapses first,
    /// [`ExecError::Cancelled`] when the token fires first, and
    /// [`ExecError::Runtime`] for engine faults. A non-zero exit code is NOT
    /// an error; it comes back inside [`ExecOutcome`].
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        container_id: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutcome, ExecError> {
        tracing::info!(container_id, command, timeout_secs = timeout.as_secs(), "exec started");
        let start = Instant::now();

        let argv = vec!["sh".to_string(), "-c".to_string(), command.to_string()];
        let mut session = self.runtime.exec(container_id, &argv).await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        // Demultiplex tagged chunks until EOF, racing the deadline and
        // cancellation. Dropping the session on an early exit tears the
        // exec down (the adapter kills the child when its handles drop).
        loop {
            tokio::select! {
                chunk = session.output.recv() => match chunk {
                    Some(OutputChunk::Stdout(bytes)) => stdout.extend_from_slice(&bytes),
                    Some(OutputChunk::Stderr(bytes)) => stderr.extend_from_slice(&bytes),
                    None => break,
                },
                () = cancel.cancelled() => return Err(ExecError::Cancelled),
                () = &mut deadline => return Err(ExecError::TimedOut { timeout }),
            }
        }

        let exit_code = session
            .exit
            .await
            .map_err(|_| {
                RuntimeError::Stream(std::io::Error::other("exec exited without reporting status"))
            })??;

        let outcome = ExecOutcome {
            stdout,
            stderr,
            exit_code,
            duration: start.elapsed(),
        };
        tracing::info!(
            container_id,
            exit_code = outcome.exit_code,
            duration_ms = outcome.duration.as_millis() as u64,
            "exec completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ContainerSpec, ContainerSummary, ExecSession};
    use async_trait::async_trait;
    use tokio::sync::{mpsc, oneshot};

    /// Runtime whose exec replays a canned chunk script.
    struct ScriptedRuntime {
        chunks: Vec<OutputChunk>,
        exit_code: i32,
        chunk_delay: Duration,
        hang: bool,
    }

    impl ScriptedRuntime {
        fn new(chunks: Vec<OutputChunk>, exit_code: i32) -> Self {
            Self {
                chunks,
                exit_code,
                chunk_delay: Duration::ZERO,
                hang: false,
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for ScriptedRuntime {
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

        async fn exec(&self, _: &str, argv: &[String]) -> Result<ExecSession, RuntimeError> {
            assert_eq!(argv[0], "sh");
            assert_eq!(argv[1], "-c");

            let (tx, rx) = mpsc::channel(16);
            let (etx, erx) = oneshot::channel();
            let chunks = self.chunks.clone();
            let exit_code = self.exit_code;
            let delay = self.chunk_delay;
            let hang = self.hang;

            tokio::spawn(async move {
                for chunk in chunks {
                    if delay > Duration::ZERO {
                        tokio::time::sleep(delay).await;
                    }
                    if tx.send(chunk).await.is_err() {
                        return;
                    }
                }
                if hang {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                drop(tx);
                let _ = etx.send(Ok(exit_code));
            });

            Ok(ExecSession {
                output: rx,
                exit: erx,
            })
        }
    }

    #[tokio::test]
    async fn demultiplexes_interleaved_streams() {
        let runtime = Arc::new(ScriptedRuntime::new(
            vec![
                OutputChunk::Stdout(b"out-1 ".to_vec()),
                OutputChunk::Stderr(b"err-1 ".to_vec()),
                OutputChunk::Stdout(b"out-2".to_vec()),
                OutputChunk::Stderr(b"err-2".to_vec()),
            ],
            3,
        ));
        let executor = Executor::new(runtime);

        let outcome = executor
            .run(&CancellationToken::new(), "c", "lint ./...", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(outcome.stdout, b"out-1 out-2");
        assert_eq!(outcome.stderr, b"err-1 err-2");
        assert_eq!(outcome.exit_code, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_output_never_finishes() {
        let runtime = Arc::new(ScriptedRuntime {
            chunks: vec![OutputChunk::Stdout(b"partial".to_vec())],
            exit_code: 0,
            chunk_delay: Duration::ZERO,
            hang: true,
        });
        let executor = Executor::new(runtime);

        let err = executor
            .run(&CancellationToken::new(), "c", "sleep 999", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn cancellation_interrupts_exec() {
        let runtime = Arc::new(ScriptedRuntime {
            chunks: Vec::new(),
            exit_code: 0,
            chunk_delay: Duration::ZERO,
            hang: true,
        });
        let executor = Executor::new(runtime);

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = executor
            .run(&cancel, "c", "sleep 999", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
    }
}
