use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::error;

use crate::{
    commands::{split_command, Command, StopTarget},
    compose::StackLauncher,
    config::Config,
    domain::UserId,
    engine::ContainerEngine,
    errors::Error,
    security::{RateLimiter, SkipList},
    Result,
};

/// Separator inserted between log lines so multi-line output stays readable
/// in chat clients that collapse plain newlines.
pub const LOG_LINE_SEPARATOR: &str = "\n\t\t\t\t#---Next Line---#\n";

const RATE_LIMIT_REPLY: &str = "Please wait before sending another command.";

/// Maps an inbound message to a command handler and returns the replies to
/// send, in order.
///
/// Per message the pipeline is: parse and validate, check the skip list,
/// charge the per-user cooldown, then call the engine. Rejections earlier in
/// the pipeline never consume the cooldown.
pub struct Dispatcher {
    cfg: Arc<Config>,
    engine: Arc<dyn ContainerEngine>,
    stacks: StackLauncher,
    skip_list: SkipList,
    limiter: Mutex<RateLimiter>,
}

impl Dispatcher {
    pub fn new(cfg: Arc<Config>, engine: Arc<dyn ContainerEngine>, stacks: StackLauncher) -> Self {
        let skip_list = SkipList::new(cfg.containers_to_skip.iter().cloned());
        let limiter = Mutex::new(RateLimiter::new(
            cfg.command_cooldown,
            cfg.rate_limit_max_entries,
        ));

        Self {
            cfg,
            engine,
            stacks,
            skip_list,
            limiter,
        }
    }

    pub fn skip_list_len(&self) -> usize {
        self.skip_list.len()
    }

    /// Handle one inbound message and return the replies for it.
    ///
    /// Validation failures come back as replies, not errors; an `Err` from
    /// here means something unexpected broke and the caller should answer
    /// with a generic failure message.
    pub async fn handle(&self, user: UserId, text: &str) -> Result<Vec<String>> {
        let Some((name, args)) = split_command(text) else {
            // Free text is echoed back verbatim, still under the cooldown.
            if !self.charge(user).await {
                return Ok(vec![RATE_LIMIT_REPLY.to_string()]);
            }
            return Ok(vec![text.to_string()]);
        };

        let parsed = Command::parse(&name, &args, &self.cfg.name_limits, self.cfg.default_log_tail);
        let cmd = match parsed {
            Ok(Some(cmd)) => cmd,
            // Unknown commands get no reply at all.
            Ok(None) => return Ok(Vec::new()),
            Err(Error::Validation(msg)) => return Ok(vec![msg]),
            Err(e) => return Err(e),
        };

        if let Some(target) = cmd.container_target() {
            if self.skip_list.is_skipped(target) {
                return Ok(vec![format!("Container '{target}' is in the skip list.")]);
            }
        }

        if !self.charge(user).await {
            return Ok(vec![RATE_LIMIT_REPLY.to_string()]);
        }

        match cmd {
            Command::Help => Ok(vec![help_text()]),
            Command::List => self.handle_list().await,
            Command::Start { name } => Ok(self.handle_start(&name).await),
            Command::Stop {
                target: StopTarget::Named(name),
            } => Ok(self.handle_stop_one(&name).await),
            Command::Stop {
                target: StopTarget::All,
            } => self.handle_stop_all().await,
            Command::Delete { name } => Ok(self.handle_delete(&name).await),
            Command::Logs {
                name,
                tail,
                warning,
            } => Ok(self.handle_logs(&name, tail, warning).await),
            Command::Compose { repo_url, branch } => {
                Ok(self.handle_compose(&repo_url, &branch).await)
            }
        }
    }

    async fn charge(&self, user: UserId) -> bool {
        self.limiter.lock().await.allow(user)
    }

    async fn handle_list(&self) -> Result<Vec<String>> {
        let containers = self.engine.list_running().await?;
        let names: Vec<String> = containers
            .into_iter()
            .map(|c| c.name)
            .filter(|name| !self.skip_list.is_skipped(name))
            .collect();

        if names.is_empty() {
            return Ok(vec!["No containers available.".to_string()]);
        }
        // One message per container, matching how chat clients render lists.
        Ok(names)
    }

    async fn handle_start(&self, name: &str) -> Vec<String> {
        match self.engine.start(name).await {
            Ok(()) => vec![format!("Container '{name}' has been started.")],
            Err(Error::NotFound { .. }) => vec![format!("Container '{name}' not found.")],
            Err(e) => {
                error!("Error starting container {name}: {e}");
                vec![format!("Failed to start container '{name}': {e}")]
            }
        }
    }

    async fn handle_stop_one(&self, name: &str) -> Vec<String> {
        match self.engine.stop(name, self.cfg.stop_grace).await {
            Ok(()) => vec![format!("Container '{name}' has been stopped.")],
            Err(Error::NotFound { .. }) => vec![format!("Container '{name}' not found.")],
            Err(e) => {
                error!("Error stopping container {name}: {e}");
                vec![format!("Failed to stop container '{name}': {e}")]
            }
        }
    }

    async fn handle_stop_all(&self) -> Result<Vec<String>> {
        let containers = self.engine.list_running().await?;

        let mut stopped = Vec::new();
        for container in containers {
            if self.skip_list.is_skipped(&container.name) {
                continue;
            }
            // One container failing must not abort the rest of the batch.
            match self.engine.stop(&container.name, self.cfg.stop_grace).await {
                Ok(()) => stopped.push(container.name),
                Err(e) => error!("Error stopping container {}: {e}", container.name),
            }
        }

        if stopped.is_empty() {
            return Ok(vec!["No applicable containers to stop.".to_string()]);
        }
        Ok(vec![format!(
            "Stopped containers:-\n{}",
            stopped.join("\n")
        )])
    }

    async fn handle_delete(&self, name: &str) -> Vec<String> {
        match self.engine.remove(name).await {
            Ok(()) => vec![format!("Container '{name}' has been deleted.")],
            Err(Error::NotFound { .. }) => vec![format!("Container '{name}' not found.")],
            Err(e) => {
                error!("Error deleting container {name}: {e}");
                vec![format!("Failed to delete container '{name}': {e}")]
            }
        }
    }

    async fn handle_logs(&self, name: &str, tail: u32, warning: Option<String>) -> Vec<String> {
        let mut replies = Vec::new();
        if let Some(warning) = warning {
            replies.push(warning);
        }

        match self.engine.tail_logs(name, tail).await {
            Ok(raw) => replies.push(format_log_lines(&raw)),
            Err(Error::NotFound { .. }) => replies.push(format!("Container '{name}' not found.")),
            Err(e) => {
                error!("Error getting logs for container {name}: {e}");
                replies.push(format!("Failed to get logs for container '{name}': {e}"));
            }
        }
        replies
    }

    async fn handle_compose(&self, repo_url: &str, branch: &str) -> Vec<String> {
        match self.stacks.launch(repo_url, branch).await {
            Ok(()) => vec![format!("Compose stack for branch '{branch}' is up.")],
            Err(e) => {
                error!("Error launching compose stack from {repo_url}: {e}");
                vec![format!("Failed to bring up compose stack: {e}")]
            }
        }
    }
}

/// Join raw log output with the visible separator, one chunk per line.
pub fn format_log_lines(raw: &str) -> String {
    let joined = raw.lines().collect::<Vec<_>>().join(LOG_LINE_SEPARATOR);
    if joined.is_empty() {
        return "No log output.".to_string();
    }
    joined
}

fn help_text() -> String {
    "Use following commands\n    \
     /help    - to get help\n    \
     /list    - to get list of containers\n    \
     /start   - to start a container\n    \
     /stop    - to stop a container, or 'all' to stop every container\n    \
     /logs    - to get container logs, optionally with -n <lines>\n    \
     /del     - to delete a container\n    \
     /compose - to bring up a compose stack from a repository branch"
        .to_string()
}
