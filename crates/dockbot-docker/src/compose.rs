//! Repository-clone and `docker compose` adapters for launching stacks.

use std::{collections::VecDeque, path::Path, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use dockbot_core::{
    compose::{ComposeRunner, RepoFetcher},
    errors::Error,
    Result,
};

const OUTPUT_TAIL_MAX_BYTES: usize = 16 * 1024;
const OUTPUT_TAIL_MAX_LINES: usize = 200;

/// Clones repositories with libgit2.
///
/// Clone work runs on the blocking pool so a slow remote cannot stall
/// unrelated update handling.
pub struct GitFetcher;

#[async_trait]
impl RepoFetcher for GitFetcher {
    async fn clone_branch(&self, repo_url: &str, branch: &str, dest: &Path) -> Result<()> {
        let url = repo_url.to_string();
        let branch = branch.to_string();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || {
            git2::build::RepoBuilder::new()
                .branch(&branch)
                .clone(&url, &dest)
                .map(|_| ())
                .map_err(|e| Error::External(format!("git clone failed: {}", e.message())))
        })
        .await
        .map_err(|e| Error::External(format!("clone task failed: {e}")))?
    }
}

/// Runs the `docker compose` CLI in detached mode.
pub struct ComposeCli;

#[async_trait]
impl ComposeRunner for ComposeCli {
    async fn up(&self, manifest: &Path) -> Result<()> {
        let dir = manifest.parent().unwrap_or_else(|| Path::new("."));

        info!("Running docker compose up for {}", manifest.display());
        let output = Command::new("docker")
            .args(["compose", "-f"])
            .arg(manifest)
            .args(["up", "-d"])
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Compose(format!("failed to run docker compose: {e}")))?;

        if !output.status.success() {
            let mut tail = OutputTail::default();
            for line in String::from_utf8_lossy(&output.stderr).lines() {
                tail.push_line(line.to_string());
            }

            let stderr = tail.snapshot();
            if stderr.trim().is_empty() {
                return Err(Error::Compose(format!(
                    "docker compose up exited with {}",
                    output.status
                )));
            }
            return Err(Error::Compose(format!(
                "docker compose up exited with {}\nstderr (tail):\n{stderr}",
                output.status
            )));
        }

        Ok(())
    }
}

/// Bounded tail of subprocess output, so a chatty failure does not balloon
/// the error we report.
#[derive(Clone, Debug, Default)]
struct OutputTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl OutputTail {
    fn push_line(&mut self, line: String) {
        // +1 for the '\n' we join with later.
        self.bytes = self.bytes.saturating_add(line.len() + 1);
        self.lines.push_back(line);

        while self.lines.len() > OUTPUT_TAIL_MAX_LINES || self.bytes > OUTPUT_TAIL_MAX_BYTES {
            if let Some(front) = self.lines.pop_front() {
                self.bytes = self.bytes.saturating_sub(front.len() + 1);
            } else {
                break;
            }
        }
    }

    fn snapshot(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use git2::{Repository, Signature};

    fn init_repo_with_manifest(path: &Path) -> String {
        let repo = Repository::init(path).expect("failed to init repo");
        std::fs::write(path.join("compose.yaml"), "services: {}\n")
            .expect("failed to write manifest");

        let mut index = repo.index().expect("failed to get index");
        index
            .add_path(Path::new("compose.yaml"))
            .expect("failed to add to index");
        index.write().expect("failed to write index");

        let tree_id = index.write_tree().expect("failed to write tree");
        let tree = repo.find_tree(tree_id).expect("failed to find tree");
        let sig = Signature::now("Test User", "test@example.com").expect("failed to create sig");
        repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
            .expect("failed to create initial commit");

        // The default branch name depends on the host git config.
        let branch = repo
            .head()
            .expect("failed to get head")
            .shorthand()
            .expect("head has no shorthand")
            .to_string();
        branch
    }

    #[tokio::test]
    async fn clones_the_requested_branch() {
        let src = tempfile::tempdir().unwrap();
        let branch = init_repo_with_manifest(src.path());

        let dest_root = tempfile::tempdir().unwrap();
        let dest = dest_root.path().join("checkout");

        GitFetcher
            .clone_branch(src.path().to_str().unwrap(), &branch, &dest)
            .await
            .unwrap();

        assert!(dest.join("compose.yaml").is_file());
    }

    #[tokio::test]
    async fn missing_branch_is_reported() {
        let src = tempfile::tempdir().unwrap();
        init_repo_with_manifest(src.path());

        let dest_root = tempfile::tempdir().unwrap();
        let dest = dest_root.path().join("checkout");

        let err = GitFetcher
            .clone_branch(src.path().to_str().unwrap(), "no-such-branch", &dest)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("git clone failed"));
    }

    #[test]
    fn output_tail_keeps_only_recent_lines() {
        let mut tail = OutputTail::default();
        for i in 0..OUTPUT_TAIL_MAX_LINES + 50 {
            tail.push_line(format!("line {i}"));
        }

        assert_eq!(tail.lines.len(), OUTPUT_TAIL_MAX_LINES);
        let snapshot = tail.snapshot();
        assert!(!snapshot.contains("line 0\n"));
        assert!(snapshot.ends_with(&format!("line {}", OUTPUT_TAIL_MAX_LINES + 49)));
    }

    #[test]
    fn output_tail_respects_byte_cap() {
        let mut tail = OutputTail::default();
        for _ in 0..10 {
            tail.push_line("x".repeat(4096));
        }

        assert!(tail.bytes <= OUTPUT_TAIL_MAX_BYTES);
        assert!(tail.lines.len() < 10);
    }
}
