//! Version-control port: stash round-trip, staged snapshot access, and hook
//! management.
//!
//! Production code uses [`GitCli`], which shells out to `git`; tests use
//! in-memory mocks. The stash contract is the backbone of working-tree
//! isolation: unstaged and untracked changes are stashed with a marker
//! message before gates run and restored on every exit path.

mod diff;
mod git;

use async_trait::async_trait;
use thiserror::Error;

pub use diff::{filter_by_size, split_diffs};
pub use git::GitCli;

/// One file's staged patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Destination path (the `b/` side of the diff header).
    pub path: String,
    /// The unified-diff fragment, starting with `diff --git `.
    pub content: String,
}

/// Git operation failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VcsError {
    /// The git binary could not be launched.
    #[error("launching git: {0}")]
    Spawn(#[source] std::io::Error),

    /// A git command exited non-zero.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand and arguments.
        command: String,
        /// Trimmed stderr.
        stderr: String,
    },

    /// A hook file operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// A pre-commit hook exists that gatekeeper does not manage.
    #[error("pre-commit hook already exists at {path} — remove it first or back it up")]
    HookExists {
        /// Path of the conflicting hook.
        path: std::path::PathBuf,
    },

    /// The installed hook lacks the gatekeeper marker.
    #[error("pre-commit hook exists but is not managed by gatekeeper — will not remove")]
    HookNotManaged,
}

/// Abstracts git for testability.
#[async_trait]
pub trait GitService: Send + Sync {
    /// Per-file diffs of staged changes.
    async fn staged_diff(&self) -> Result<Vec<FileDiff>, VcsError>;

    /// Paths of staged files.
    async fn staged_files(&self) -> Result<Vec<String>, VcsError>;

    /// Stash unstaged and untracked changes so only the staged snapshot
    /// remains. Returns false (without creating a stash) when there is
    /// nothing to stash.
    async fn stash(&self) -> Result<bool, VcsError>;

    /// Restore the gatekeeper stash, if one exists. Absent stash is a no-op.
    async fn stash_pop(&self) -> Result<(), VcsError>;

    /// Discard working-tree modifications and untracked files created by
    /// writable gates. Runs between gate completion and stash pop.
    async fn clean_writable_files(&self) -> Result<(), VcsError>;

    /// Install the pre-commit hook. Idempotent for a marker-bearing hook;
    /// refuses to overwrite a foreign hook.
    async fn install_hook(&self) -> Result<(), VcsError>;

    /// Remove the marker-bearing pre-commit hook. Missing hook is a no-op;
    /// a foreign hook is refused.
    async fn remove_hook(&self) -> Result<(), VcsError>;
}
