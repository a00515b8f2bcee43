//! Docker adapter for the container-engine port.
//!
//! Talks to the local daemon over its default socket via `bollard`.

pub mod compose;

use std::time::Duration;

use async_trait::async_trait;
use bollard::{
    container::{
        ListContainersOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
        StopContainerOptions,
    },
    errors::Error as BollardError,
    Docker,
};
use futures::StreamExt;
use tracing::debug;

use dockbot_core::{
    engine::{ContainerEngine, ContainerSummary},
    errors::Error,
    Result,
};

pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect with the platform defaults (the local Unix socket on Linux).
    ///
    /// The connection is lazy; call [`ping`](Self::ping) to verify the daemon
    /// is actually reachable.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Engine(format!("failed to connect to Docker daemon: {e}")))?;
        Ok(Self { docker })
    }

    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| Error::Engine(format!("Docker daemon is not responding: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_running(&self) -> Result<Vec<ContainerSummary>> {
        // Default options list running containers only.
        let options = ListContainersOptions::<String>::default();
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| Error::Engine(e.to_string()))?;

        Ok(summaries
            .into_iter()
            .filter_map(|c| {
                let raw = c.names.unwrap_or_default().into_iter().next()?;
                Some(ContainerSummary {
                    name: display_name(&raw).to_string(),
                })
            })
            .collect())
    }

    async fn start(&self, name: &str) -> Result<()> {
        match self
            .docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            // 304 means the container was already running.
            Err(e) if is_not_modified(&e) => {
                debug!("Container {name} is already running");
                Ok(())
            }
            Err(e) => Err(map_engine_error(name, e)),
        }
    }

    async fn stop(&self, name: &str, grace: Duration) -> Result<()> {
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        match self.docker.stop_container(name, Some(options)).await {
            Ok(()) => Ok(()),
            // 304 means the container was already stopped.
            Err(e) if is_not_modified(&e) => {
                debug!("Container {name} is already stopped");
                Ok(())
            }
            Err(e) => Err(map_engine_error(name, e)),
        }
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            link: false,
        };
        self.docker
            .remove_container(name, Some(options))
            .await
            .map_err(|e| map_engine_error(name, e))
    }

    async fn tail_logs(&self, name: &str, lines: u32) -> Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: lines.to_string(),
            follow: false,
            ..Default::default()
        };

        let mut stream = self.docker.logs(name, Some(options));
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_engine_error(name, e))?;
            out.push_str(&chunk.to_string());
        }
        Ok(out)
    }
}

/// The daemon reports names with a leading slash; strip it for display.
fn display_name(raw: &str) -> &str {
    raw.strip_prefix('/').unwrap_or(raw)
}

fn is_not_modified(err: &BollardError) -> bool {
    matches!(
        err,
        BollardError::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}

fn map_engine_error(name: &str, err: BollardError) -> Error {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => Error::NotFound {
            name: name.to_string(),
        },
        other => Error::Engine(other.to_string()),
    }
}
