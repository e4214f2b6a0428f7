//! Warm container pool with keyed reuse and lazy TTL eviction.
//!
//! The pool keeps no state of its own: every managed container carries its
//! identity and bookkeeping as labels, so a fresh invocation re-discovers the
//! pool by listing labeled containers. Acquire and cleanup are serialized
//! behind one mutex; executors use the returned container id without holding
//! the lock.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::{ContainerRuntime, ContainerSpec, RuntimeError};

/// Marks a container as owned by gatekeeper.
pub const LABEL_MANAGED: &str = "gatekeeper.managed";
/// The reuse key digest.
pub const LABEL_POOL_KEY: &str = "gatekeeper.pool_key";
/// Image reference the container was created from.
pub const LABEL_IMAGE: &str = "gatekeeper.image";
/// Absolute project path mounted into the container.
pub const LABEL_PROJECT: &str = "gatekeeper.project";
/// RFC3339 creation watermark used for TTL eviction.
pub const LABEL_LAST_USED: &str = "gatekeeper.last_used";
/// Whether the project mount is read-write.
pub const LABEL_WRITABLE: &str = "gatekeeper.writable";

/// Warm pool of long-lived containers.
pub struct Pool {
    runtime: Arc<dyn ContainerRuntime>,
    lock: Mutex<()>,
    now: fn() -> DateTime<Utc>,
}

impl Pool {
    /// Create a pool over the given runtime.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::with_clock(runtime, Utc::now)
    }

    /// Create a pool with an injected clock. Tests pin "now" with this.
    #[must_use]
    pub fn with_clock(runtime: Arc<dyn ContainerRuntime>, now: fn() -> DateTime<Utc>) -> Self {
        Self {
            runtime,
            lock: Mutex::new(()),
            now,
        }
    }

    /// Return a running container for `(image, project, writable)`, creating
    /// and starting one on cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when listing, pulling, creating, or starting
    /// fails. A container that fails to start is removed best-effort before
    /// the error is returned.
    pub async fn acquire(
        &self,
        image: &str,
        project: &Path,
        writable: bool,
    ) -> Result<String, RuntimeError> {
        tracing::info!(image, project = %project.display(), writable, "acquiring container");
        let _guard = self.lock.lock().await;

        let key = pool_key(image, project, writable);

        let existing = self
            .runtime
            .list_containers(&[(LABEL_POOL_KEY.to_string(), key.clone())], true)
            .await?;
        if let Some(container) = existing.into_iter().next() {
            tracing::info!(container_id = %container.id, "reusing warm container");
            return Ok(container.id);
        }

        let id = self.create(image, project, writable, &key).await?;
        tracing::info!(container_id = %id, "created new container");
        Ok(id)
    }

    async fn create(
        &self,
        image: &str,
        project: &Path,
        writable: bool,
        key: &str,
    ) -> Result<String, RuntimeError> {
        tracing::debug!(image, "pulling image");
        self.runtime.pull_image(image).await?;

        let user = if writable {
            // Writable mounts must not create root-owned files in the
            // project tree.
            Some(current_user_string())
        } else {
            None
        };

        let spec = ContainerSpec {
            image: image.to_string(),
            entrypoint: vec!["sleep".to_string(), "infinity".to_string()],
            working_dir: "/workspace".to_string(),
            labels: vec![
                (LABEL_MANAGED.to_string(), "true".to_string()),
                (LABEL_POOL_KEY.to_string(), key.to_string()),
                (LABEL_IMAGE.to_string(), image.to_string()),
                (LABEL_PROJECT.to_string(), project.display().to_string()),
                (LABEL_WRITABLE.to_string(), writable.to_string()),
                (LABEL_LAST_USED.to_string(), (self.now)().to_rfc3339()),
            ],
            project_dir: project.to_path_buf(),
            writable,
            user,
        };

        let id = self.runtime.create_container(&spec).await?;
        tracing::debug!(container_id = %id, "container created");

        if let Err(err) = self.runtime.start_container(&id).await {
            let _ = self.runtime.remove_container(&id).await;
            return Err(err);
        }

        Ok(id)
    }

    /// Remove managed containers idle longer than `ttl`. Containers with a
    /// missing or unparseable watermark are left alone. Returns the number
    /// of successful removals; per-container failures are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Only the initial container listing can fail.
    pub async fn evict_stale(&self, ttl: Duration) -> Result<usize, RuntimeError> {
        tracing::info!(ttl_secs = ttl.as_secs(), "evicting stale containers");
        let _guard = self.lock.lock().await;

        let containers = self.list_managed().await?;
        let Some(threshold) = chrono::TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| (self.now)().checked_sub_signed(delta))
        else {
            // A TTL too large to represent makes nothing stale.
            return Ok(0);
        };

        let mut removed = 0;
        for container in containers {
            let Some(last_used) = container.labels.get(LABEL_LAST_USED) else {
                continue;
            };
            let Ok(last_used) = DateTime::parse_from_rfc3339(last_used) else {
                continue;
            };

            if last_used.with_timezone(&Utc) < threshold {
                match self.runtime.remove_container(&container.id).await {
                    Ok(()) => removed += 1,
                    Err(err) => {
                        tracing::error!(container_id = %container.id, error = %err, "failed to remove stale container");
                    }
                }
            }
        }

        tracing::info!(removed, "stale eviction completed");
        Ok(removed)
    }

    /// Remove every managed container. Returns the number of successful
    /// removals; per-container failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Only the initial container listing can fail.
    pub async fn evict_all(&self) -> Result<usize, RuntimeError> {
        tracing::info!("removing all managed containers");
        let _guard = self.lock.lock().await;

        let containers = self.list_managed().await?;

        let mut removed = 0;
        for container in containers {
            match self.runtime.remove_container(&container.id).await {
                Ok(()) => removed += 1,
                Err(err) => {
                    tracing::error!(container_id = %container.id, error = %err, "failed to remove container");
                }
            }
        }

        tracing::info!(removed, "cleanup completed");
        Ok(removed)
    }

    async fn list_managed(&self) -> Result<Vec<super::ContainerSummary>, RuntimeError> {
        self.runtime
            .list_containers(&[(LABEL_MANAGED.to_string(), "true".to_string())], false)
            .await
    }
}

/// Deterministic digest identifying a reusable container. Two invocations
/// with the same triple share a container; differing `writable` never share.
#[must_use]
pub(crate) fn pool_key(image: &str, project: &Path, writable: bool) -> String {
    let data = format!("{image}|{}|{writable}", project.display());
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn current_user_string() -> String {
    format!("{}:{}", nix::unistd::getuid(), nix::unistd::getgid())
}
