use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::{errors::Error, Result};

/// Manifest file names probed inside a checkout, in preference order.
pub const MANIFEST_CANDIDATES: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Port for fetching a repository checkout.
#[async_trait]
pub trait RepoFetcher: Send + Sync {
    /// Clone exactly `branch` of `repo_url` into `dest`.
    async fn clone_branch(&self, repo_url: &str, branch: &str, dest: &Path) -> Result<()>;
}

/// Port for bringing up a compose stack from a manifest file.
#[async_trait]
pub trait ComposeRunner: Send + Sync {
    async fn up(&self, manifest: &Path) -> Result<()>;
}

/// Clones a repository branch into a scratch workspace and brings up the
/// compose stack it describes.
///
/// The workspace is deleted on every outcome unless `keep_failed` is set, in
/// which case a failed launch leaves it behind (logged) for inspection.
pub struct StackLauncher {
    fetcher: Arc<dyn RepoFetcher>,
    runner: Arc<dyn ComposeRunner>,
    work_root: PathBuf,
    keep_failed: bool,
}

impl StackLauncher {
    pub fn new(
        fetcher: Arc<dyn RepoFetcher>,
        runner: Arc<dyn ComposeRunner>,
        work_root: PathBuf,
        keep_failed: bool,
    ) -> Self {
        Self {
            fetcher,
            runner,
            work_root,
            keep_failed,
        }
    }

    pub async fn launch(&self, repo_url: &str, branch: &str) -> Result<()> {
        fs::create_dir_all(&self.work_root)?;

        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let workspace = tempfile::Builder::new()
            .prefix(&format!("stack-{stamp}-"))
            .tempdir_in(&self.work_root)?;

        info!(
            "Launching compose stack from {repo_url} ({branch}) in {}",
            workspace.path().display()
        );
        let result = self.launch_in(workspace.path(), repo_url, branch).await;

        if result.is_err() && self.keep_failed {
            let kept = workspace.keep();
            warn!(
                "Keeping failed compose workspace for inspection: {}",
                kept.display()
            );
        }
        // Otherwise the workspace guard cleans up when it drops here.

        result
    }

    async fn launch_in(&self, workspace: &Path, repo_url: &str, branch: &str) -> Result<()> {
        let checkout = workspace.join("repo");
        self.fetcher.clone_branch(repo_url, branch, &checkout).await?;

        let Some(manifest) = find_manifest(&checkout) else {
            return Err(Error::Compose(format!(
                "no compose manifest found in the checkout (looked for {})",
                MANIFEST_CANDIDATES.join(", ")
            )));
        };

        self.runner.up(&manifest).await
    }
}

/// The first manifest candidate that exists in `dir`, if any.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    MANIFEST_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    struct FakeFetcher {
        manifest_name: Option<&'static str>,
    }

    #[async_trait]
    impl RepoFetcher for FakeFetcher {
        async fn clone_branch(&self, _repo_url: &str, _branch: &str, dest: &Path) -> Result<()> {
            fs::create_dir_all(dest)?;
            if let Some(name) = self.manifest_name {
                fs::write(dest.join(name), "services: {}\n")?;
            }
            Ok(())
        }
    }

    struct RecordingRunner {
        fail: bool,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl RecordingRunner {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ComposeRunner for RecordingRunner {
        async fn up(&self, manifest: &Path) -> Result<()> {
            self.seen.lock().unwrap().push(manifest.to_path_buf());
            if self.fail {
                return Err(Error::Compose("compose up failed".to_string()));
            }
            Ok(())
        }
    }

    fn launcher(
        manifest_name: Option<&'static str>,
        fail: bool,
        work_root: &Path,
        keep_failed: bool,
    ) -> (StackLauncher, Arc<RecordingRunner>) {
        let runner = Arc::new(RecordingRunner::new(fail));
        let launcher = StackLauncher::new(
            Arc::new(FakeFetcher { manifest_name }),
            runner.clone(),
            work_root.to_path_buf(),
            keep_failed,
        );
        (launcher, runner)
    }

    fn workspaces_in(root: &Path) -> Vec<PathBuf> {
        fs::read_dir(root)
            .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn launch_runs_compose_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let (launcher, runner) = launcher(Some("compose.yaml"), false, root.path(), false);

        launcher
            .launch("https://example.com/repo.git", "main")
            .await
            .unwrap();

        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ends_with("repo/compose.yaml"));
        assert!(workspaces_in(root.path()).is_empty());
    }

    #[tokio::test]
    async fn failed_launch_cleans_up_by_default() {
        let root = tempfile::tempdir().unwrap();
        let (launcher, _) = launcher(Some("docker-compose.yml"), true, root.path(), false);

        let err = launcher
            .launch("https://example.com/repo.git", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Compose(_)));
        assert!(workspaces_in(root.path()).is_empty());
    }

    #[tokio::test]
    async fn failed_launch_keeps_workspace_when_configured() {
        let root = tempfile::tempdir().unwrap();
        let (launcher, _) = launcher(Some("compose.yml"), true, root.path(), true);

        launcher
            .launch("https://example.com/repo.git", "main")
            .await
            .unwrap_err();

        let kept = workspaces_in(root.path());
        assert_eq!(kept.len(), 1);
        assert!(kept[0].join("repo/compose.yml").is_file());
    }

    #[tokio::test]
    async fn missing_manifest_fails_before_running_compose() {
        let root = tempfile::tempdir().unwrap();
        let (launcher, runner) = launcher(None, false, root.path(), false);

        let err = launcher
            .launch("https://example.com/repo.git", "main")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no compose manifest found"));
        assert!(runner.seen.lock().unwrap().is_empty());
        assert!(workspaces_in(root.path()).is_empty());
    }

    #[test]
    fn manifest_candidates_are_probed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_manifest(dir.path()), None);

        fs::write(dir.path().join("docker-compose.yml"), "").unwrap();
        assert!(find_manifest(dir.path())
            .unwrap()
            .ends_with("docker-compose.yml"));

        fs::write(dir.path().join("compose.yaml"), "").unwrap();
        assert!(find_manifest(dir.path()).unwrap().ends_with("compose.yaml"));
    }
}
