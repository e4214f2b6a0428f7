//! Docker adapter driving the `docker` CLI.
//!
//! Every operation is a subprocess invocation with captured output; a
//! non-zero exit surfaces the trimmed stderr as [`RuntimeError::Command`].
//! Exec attaches to the child's pipes and republishes them as the tagged
//! chunk stream the [`Executor`](super::Executor) demultiplexes.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use super::{ContainerRuntime, ContainerSpec, ContainerSummary, ExecSession, OutputChunk, RuntimeError};

const CHUNK_SIZE: usize = 8 * 1024;

/// Production [`ContainerRuntime`] backed by the `docker` binary.
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    /// Create an adapter using `docker` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// Run a docker subcommand to completion, returning trimmed stdout.
    async fn run(&self, context: &str, args: &[String]) -> Result<String, RuntimeError> {
        tracing::debug!(context, ?args, "running docker command");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(RuntimeError::Spawn)?;

        if !output.status.success() {
            return Err(RuntimeError::Command {
                context: context.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn inspect_labels(&self, id: &str) -> Result<HashMap<String, String>, RuntimeError> {
        let stdout = self
            .run(
                "inspect",
                &[
                    "inspect".into(),
                    "--format".into(),
                    "{{json .Config.Labels}}".into(),
                    id.into(),
                ],
            )
            .await?;

        if stdout.is_empty() || stdout == "null" {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&stdout).map_err(|err| RuntimeError::Command {
            context: "inspect".into(),
            stderr: format!("unparseable container labels: {err}"),
        })
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.run(
            "ping",
            &["version".into(), "--format".into(), "{{.Server.Version}}".into()],
        )
        .await
        .map(|_| ())
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        // `output()` waits for process exit, so the pull stream is fully
        // consumed before we report success.
        self.run("pull", &["pull".into(), "--quiet".into(), image.into()])
            .await
            .map(|_| ())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut args: Vec<String> = vec!["create".into(), "--workdir".into(), spec.working_dir.clone()];

        for (key, value) in &spec.labels {
            args.push("--label".into());
            args.push(format!("{key}={value}"));
        }

        let mut project_mount = format!(
            "type=bind,source={},target={}",
            spec.project_dir.display(),
            spec.working_dir
        );
        if !spec.writable {
            project_mount.push_str(",readonly");
        }
        args.push("--mount".into());
        args.push(project_mount);
        args.push("--mount".into());
        args.push("type=tmpfs,target=/tmp".into());

        if let Some(user) = &spec.user {
            args.push("--user".into());
            args.push(user.clone());
        }

        // `--entrypoint` takes a single binary; the rest of the argv goes
        // after the image reference.
        let (entry, entry_args) = spec
            .entrypoint
            .split_first()
            .ok_or_else(|| RuntimeError::Command {
                context: "create".into(),
                stderr: "container spec has an empty entrypoint".into(),
            })?;
        args.push("--entrypoint".into());
        args.push(entry.clone());
        args.push(spec.image.clone());
        args.extend(entry_args.iter().cloned());

        self.run("create", &args).await
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.run("start", &["start".into(), id.into()]).await.map(|_| ())
    }

    async fn list_containers(
        &self,
        label_filters: &[(String, String)],
        running_only: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut args: Vec<String> = vec!["ps".into()];
        if !running_only {
            args.push("--all".into());
        }
        for (key, value) in label_filters {
            args.push("--filter".into());
            args.push(format!("label={key}={value}"));
        }
        args.push("--format".into());
        args.push("{{.ID}}".into());

        let stdout = self.run("ps", &args).await?;

        let mut containers = Vec::new();
        for id in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let labels = self.inspect_labels(id).await?;
            containers.push(ContainerSummary {
                id: id.to_string(),
                labels,
            });
        }
        Ok(containers)
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.run("rm", &["rm".into(), "--force".into(), id.into()])
            .await
            .map(|_| ())
    }

    async fn exec(&self, container_id: &str, argv: &[String]) -> Result<ExecSession, RuntimeError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("exec").arg(container_id).args(argv);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(RuntimeError::Spawn)?;
        let stdout = child.stdout.take().ok_or_else(|| {
            RuntimeError::Stream(std::io::Error::other("exec stdout pipe missing"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            RuntimeError::Stream(std::io::Error::other("exec stderr pipe missing"))
        })?;

        let (tx, rx) = mpsc::channel(32);
        let (mut exit_tx, exit_rx) = oneshot::channel();

        let out_pump = tokio::spawn(pump(stdout, tx.clone(), OutputChunk::Stdout));
        let err_pump = tokio::spawn(pump(stderr, tx, OutputChunk::Stderr));

        tokio::spawn(async move {
            // Drain both pipes before waiting so the exit code is only
            // reported after EOF. If the session owner gives up first
            // (timeout or cancellation drops the receiver), kill the child
            // instead of waiting on it forever.
            tokio::select! {
                () = async {
                    let _ = out_pump.await;
                    let _ = err_pump.await;
                } => {}
                () = exit_tx.closed() => {
                    let _ = child.start_kill();
                }
            }

            let result = match child.wait().await {
                Ok(status) => Ok(status.code().unwrap_or(-1)),
                Err(err) => Err(RuntimeError::Stream(err)),
            };
            let _ = exit_tx.send(result);
        });

        Ok(ExecSession {
            output: rx,
            exit: exit_rx,
        })
    }
}

/// Read one pipe to EOF, republishing tagged chunks. Stops early when the
/// receiver goes away (timeout or cancellation upstream).
async fn pump<R>(
    mut reader: R,
    tx: mpsc::Sender<OutputChunk>,
    tag: fn(Vec<u8>) -> OutputChunk,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(tag(buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
        }
    }
}
