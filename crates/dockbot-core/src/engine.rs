use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// A running container as reported by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerSummary {
    pub name: String,
}

/// Port for the container engine.
///
/// Docker is the first implementation; the shape is small enough that a
/// Podman or containerd adapter could sit behind it unchanged.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Names of all currently running containers.
    async fn list_running(&self) -> Result<Vec<ContainerSummary>>;

    async fn start(&self, name: &str) -> Result<()>;

    /// Stop with a grace period before the engine kills the process.
    async fn stop(&self, name: &str, grace: Duration) -> Result<()>;

    /// Remove the container and its anonymous volumes, even if running.
    async fn remove(&self, name: &str) -> Result<()>;

    /// The last `lines` log lines, stdout and stderr interleaved.
    async fn tail_logs(&self, name: &str, lines: u32) -> Result<String>;
}
