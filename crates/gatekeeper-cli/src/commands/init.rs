//! `init`: detect the stack, write a default config, install the hook.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use gatekeeper_core::config::{detect_stacks, generate_gates_yaml, Stack};
use gatekeeper_core::vcs::{GitCli, GitService};

/// Initialize gatekeeper in the current project.
pub async fn run() -> Result<()> {
    tracing::info!("init started");

    let project_dir = std::env::current_dir().context("getting working directory")?;
    let git = GitCli::new(&project_dir);

    init_project(&project_dir, &git, &mut std::io::stdout()).await?;

    tracing::info!("init completed");
    Ok(())
}

async fn init_project(
    project_dir: &Path,
    git: &dyn GitService,
    out: &mut dyn Write,
) -> Result<()> {
    let gk_dir = project_dir.join(".gatekeeper");
    std::fs::create_dir_all(&gk_dir).context("creating .gatekeeper directory")?;

    let config_path = gk_dir.join("gates.yaml");
    if config_path.exists() {
        writeln!(
            out,
            "⚡ Config already exists at {}. Skipping generation.",
            config_path.display()
        )?;
    } else {
        let entries = std::fs::read_dir(project_dir).context("reading project directory")?;
        let files: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();

        let stacks = detect_stacks(&files);
        let yaml = generate_gates_yaml(&stacks);
        std::fs::write(&config_path, yaml).context("writing gates.yaml")?;

        if stacks.is_empty() {
            writeln!(
                out,
                "📝 No stack detected. Created minimal {} — customize it.",
                config_path.display()
            )?;
        } else {
            writeln!(
                out,
                "✅ Detected {} project. Generated {} with gates.",
                format_stacks(&stacks),
                config_path.display()
            )?;
        }
    }

    git.install_hook().await.context("installing hook")?;

    writeln!(out, "🔒 Gatekeeper initialized successfully!")?;
    Ok(())
}

fn format_stacks(stacks: &[Stack]) -> String {
    stacks
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gatekeeper_core::vcs::{FileDiff, VcsError};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingGit {
        hook_installed: AtomicBool,
    }

    #[async_trait]
    impl GitService for RecordingGit {
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
            self.hook_installed.store(true, Ordering::SeqCst);
            Ok(())
        }
        async fn remove_hook(&self) -> Result<(), VcsError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn generates_config_for_detected_stack_and_installs_hook() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module example.com/x\n").unwrap();

        let git = RecordingGit::default();
        let mut out = Vec::new();
        init_project(dir.path(), &git, &mut out).await.unwrap();

        let config = std::fs::read_to_string(dir.path().join(".gatekeeper/gates.yaml")).unwrap();
        assert!(config.contains("go-vet"));
        assert!(git.hook_installed.load(Ordering::SeqCst));

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Detected go project"));
        assert!(printed.contains("initialized successfully"));
    }

    #[tokio::test]
    async fn preserves_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let gk = dir.path().join(".gatekeeper");
        std::fs::create_dir_all(&gk).unwrap();
        std::fs::write(gk.join("gates.yaml"), "version: 1\ngates: []\n").unwrap();

        let git = RecordingGit::default();
        let mut out = Vec::new();
        init_project(dir.path(), &git, &mut out).await.unwrap();

        let config = std::fs::read_to_string(gk.join("gates.yaml")).unwrap();
        assert_eq!(config, "version: 1\ngates: []\n");
        assert!(String::from_utf8(out).unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn unmarked_project_gets_fallback_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let git = RecordingGit::default();
        let mut out = Vec::new();
        init_project(dir.path(), &git, &mut out).await.unwrap();

        assert!(String::from_utf8(out).unwrap().contains("No stack detected"));
    }
}
