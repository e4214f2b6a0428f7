//! Git adapter shelling out to the `git` binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{diff, FileDiff, GitService, VcsError};

const STASH_MESSAGE: &str = "gatekeeper-stash";
const HOOK_MARKER: &str = "# gatekeeper-managed";
const HOOK_SCRIPT: &str = "#!/bin/sh\n\
# gatekeeper-managed\n\
# This hook was installed by gatekeeper. Do not edit manually.\n\
# Run 'gatekeeper teardown' to remove.\n\
exec gatekeeper run \"$@\"\n";

/// Production [`GitService`] driving the `git` CLI in a working directory.
pub struct GitCli {
    work_dir: PathBuf,
}

impl GitCli {
    /// Create a service rooted at the given working directory.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Run git, requiring exit 0. Returns stdout.
    async fn run_git(&self, args: &[&str]) -> Result<String, VcsError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(VcsError::Spawn)?;

        if !output.status.success() {
            return Err(VcsError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run git for its exit status alone (e.g. `diff --quiet`).
    async fn git_succeeds(&self, args: &[&str]) -> Result<bool, VcsError> {
        let status = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(VcsError::Spawn)?;
        Ok(status.success())
    }

    async fn find_git_dir(&self) -> Result<PathBuf, VcsError> {
        let out = self.run_git(&["rev-parse", "--git-dir"]).await?;
        let git_dir = PathBuf::from(out.trim());
        if git_dir.is_absolute() {
            Ok(git_dir)
        } else {
            Ok(self.work_dir.join(git_dir))
        }
    }
}

#[async_trait]
impl GitService for GitCli {
    async fn staged_diff(&self) -> Result<Vec<FileDiff>, VcsError> {
        tracing::debug!("getting staged diffs");
        let out = self.run_git(&["diff", "--cached"]).await?;
        Ok(diff::split_diffs(&out))
    }

    async fn staged_files(&self) -> Result<Vec<String>, VcsError> {
        tracing::debug!("getting staged file list");
        let out = self.run_git(&["diff", "--cached", "--name-only"]).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn stash(&self) -> Result<bool, VcsError> {
        tracing::info!("stashing unstaged changes");

        // `diff --quiet` exits non-zero when unstaged changes exist.
        if self.git_succeeds(&["diff", "--quiet"]).await? {
            let untracked = self
                .run_git(&["ls-files", "--others", "--exclude-standard"])
                .await?;
            if untracked.trim().is_empty() {
                tracing::info!("nothing to stash — working tree is clean relative to index");
                return Ok(false);
            }
        }

        self.run_git(&[
            "stash",
            "push",
            "--keep-index",
            "--include-untracked",
            "-m",
            STASH_MESSAGE,
        ])
        .await?;

        tracing::info!("changes stashed");
        Ok(true)
    }

    async fn stash_pop(&self) -> Result<(), VcsError> {
        tracing::info!("restoring stashed changes");

        let list = self.run_git(&["stash", "list"]).await?;
        let Some(stash_ref) = find_stash_ref(&list) else {
            tracing::info!("no gatekeeper stash found to restore");
            return Ok(());
        };

        self.run_git(&["stash", "pop", &stash_ref]).await?;
        tracing::info!("stash restored");
        Ok(())
    }

    async fn clean_writable_files(&self) -> Result<(), VcsError> {
        tracing::info!("cleaning writable gate modifications");

        self.run_git(&["checkout", "--", "."]).await?;
        self.run_git(&["clean", "-fd"]).await?;

        tracing::info!("working tree cleaned");
        Ok(())
    }

    async fn install_hook(&self) -> Result<(), VcsError> {
        tracing::info!("installing pre-commit hook");
        let hooks_dir = self.find_git_dir().await?.join("hooks");
        install_hook_at(&hooks_dir)
    }

    async fn remove_hook(&self) -> Result<(), VcsError> {
        tracing::info!("removing pre-commit hook");
        let hooks_dir = self.find_git_dir().await?.join("hooks");
        remove_hook_at(&hooks_dir)
    }
}

/// Locate the gatekeeper stash reference (`stash@{n}`) by marker message.
/// The tool's stash is not necessarily on top of the stack.
fn find_stash_ref(stash_list: &str) -> Option<String> {
    stash_list
        .lines()
        .find(|line| line.contains(STASH_MESSAGE))
        .and_then(|line| line.split(':').next())
        .map(|stash_ref| stash_ref.trim().to_string())
        .filter(|r| !r.is_empty())
}

fn install_hook_at(hooks_dir: &Path) -> Result<(), VcsError> {
    let hook_path = hooks_dir.join("pre-commit");

    match std::fs::read_to_string(&hook_path) {
        Ok(existing) => {
            if existing.contains(HOOK_MARKER) {
                tracing::info!("hook already installed, skipping");
                return Ok(());
            }
            return Err(VcsError::HookExists { path: hook_path });
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(VcsError::Io {
                context: "reading hook".into(),
                source,
            });
        }
    }

    std::fs::create_dir_all(hooks_dir).map_err(|source| VcsError::Io {
        context: "creating hooks directory".into(),
        source,
    })?;

    std::fs::write(&hook_path, HOOK_SCRIPT).map_err(|source| VcsError::Io {
        context: "writing hook script".into(),
        source,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&hook_path, std::fs::Permissions::from_mode(0o755)).map_err(
            |source| VcsError::Io {
                context: "marking hook executable".into(),
                source,
            },
        )?;
    }

    tracing::info!(path = %hook_path.display(), "pre-commit hook installed");
    Ok(())
}

fn remove_hook_at(hooks_dir: &Path) -> Result<(), VcsError> {
    let hook_path = hooks_dir.join("pre-commit");

    let existing = match std::fs::read_to_string(&hook_path) {
        Ok(existing) => existing,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("no pre-commit hook found, nothing to remove");
            return Ok(());
        }
        Err(source) => {
            return Err(VcsError::Io {
                context: "reading hook".into(),
                source,
            });
        }
    };

    if !existing.contains(HOOK_MARKER) {
        return Err(VcsError::HookNotManaged);
    }

    std::fs::remove_file(&hook_path).map_err(|source| VcsError::Io {
        context: "removing hook".into(),
        source,
    })?;

    tracing::info!(path = %hook_path.display(), "pre-commit hook removed");
    Ok(())
}
