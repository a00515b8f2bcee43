use regex::Regex;

use crate::{errors::Error, Result};

// ============== Argument Validation Limits ==============

/// Minimum container-name length enforced per command, in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NameLengthLimits {
    pub start: usize,
    pub stop: usize,
    pub logs: usize,
    pub del: usize,
}

impl Default for NameLengthLimits {
    fn default() -> Self {
        Self {
            start: 0,
            stop: 3,
            logs: 5,
            del: 5,
        }
    }
}

// ============== Parsed Commands ==============

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopTarget {
    All,
    Named(String),
}

/// A fully validated bot command, ready for dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    Start {
        name: String,
    },
    Stop {
        target: StopTarget,
    },
    Delete {
        name: String,
    },
    Logs {
        name: String,
        tail: u32,
        /// Advisory text emitted before the logs, e.g. when `-n` was
        /// unparsable and the default tail was substituted.
        warning: Option<String>,
    },
    Compose {
        repo_url: String,
        branch: String,
    },
}

/// Split `/cmd@botname arg1 arg2` into a lowercase command name and the raw
/// argument tail. Returns `None` when the text is not a slash command.
pub fn split_command(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    Some((cmd, rest))
}

impl Command {
    /// Parse a command name plus argument tail into a [`Command`].
    ///
    /// Returns `Ok(None)` for command names the bot does not know, and
    /// [`Error::Validation`] with user-facing text for bad arguments.
    pub fn parse(
        name: &str,
        args: &str,
        limits: &NameLengthLimits,
        default_tail: u32,
    ) -> Result<Option<Self>> {
        let cmd = match name {
            "help" => Self::Help,
            "list" => Self::List,
            "start" => {
                let name = required_name(args, "Please provide a container name to start.")?;
                check_name_len(&name, limits.start)?;
                Self::Start { name }
            }
            "stop" => Self::parse_stop(args, limits)?,
            "del" => {
                let name = required_name(args, "Please provide a container name to delete.")?;
                check_name_len(&name, limits.del)?;
                Self::Delete { name }
            }
            "logs" => Self::parse_logs(args, limits, default_tail)?,
            "compose" => Self::parse_compose(args)?,
            _ => return Ok(None),
        };
        Ok(Some(cmd))
    }

    fn parse_stop(args: &str, limits: &NameLengthLimits) -> Result<Self> {
        let name = required_name(
            args,
            "Please provide a container name to stop or use 'all' to stop all containers.",
        )?;

        // The literal target is checked before the length rule so that
        // `/stop all` always works.
        if name == "all" {
            return Ok(Self::Stop {
                target: StopTarget::All,
            });
        }

        check_name_len(&name, limits.stop)?;
        Ok(Self::Stop {
            target: StopTarget::Named(name),
        })
    }

    fn parse_logs(args: &str, limits: &NameLengthLimits, default_tail: u32) -> Result<Self> {
        let argv: Vec<&str> = args.split_whitespace().collect();
        let Some(&name) = argv.first() else {
            return Err(Error::Validation(
                "Please provide a container name to get logs. \
                 Use /logs <container_name> -n <number_of_lines>."
                    .to_string(),
            ));
        };
        check_name_len(name, limits.logs)?;

        let mut tail = default_tail;
        let mut warning = None;
        if let Some(pos) = argv.iter().position(|&a| a == "-n") {
            match argv.get(pos + 1) {
                Some(raw) => match raw.parse::<u32>() {
                    Ok(n) => tail = n,
                    Err(_) => {
                        warning = Some(format!(
                            "Invalid number of lines. Using default of {default_tail} lines."
                        ));
                    }
                },
                // Trailing `-n` with no value falls back to the default.
                None => {}
            }
        }

        Ok(Self::Logs {
            name: name.to_string(),
            tail,
            warning,
        })
    }

    fn parse_compose(args: &str) -> Result<Self> {
        let argv: Vec<&str> = args.split_whitespace().collect();
        let &[repo_url, branch] = argv.as_slice() else {
            return Err(Error::Validation(
                "Usage: /compose <repo_url> <branch>".to_string(),
            ));
        };

        if !looks_like_repo_url(repo_url) {
            return Err(Error::Validation(format!(
                "'{repo_url}' does not look like a repository URL."
            )));
        }
        if !is_valid_branch(branch) {
            return Err(Error::Validation(format!(
                "'{branch}' is not a valid branch name."
            )));
        }

        Ok(Self::Compose {
            repo_url: repo_url.to_string(),
            branch: branch.to_string(),
        })
    }

    /// The container name this command operates on, when it names exactly one.
    pub fn container_target(&self) -> Option<&str> {
        match self {
            Self::Start { name } | Self::Delete { name } | Self::Logs { name, .. } => Some(name),
            Self::Stop {
                target: StopTarget::Named(name),
            } => Some(name),
            _ => None,
        }
    }
}

fn required_name(args: &str, missing_msg: &str) -> Result<String> {
    let name = args.split_whitespace().next().unwrap_or("");
    if name.is_empty() {
        return Err(Error::Validation(missing_msg.to_string()));
    }
    Ok(name.to_string())
}

fn check_name_len(name: &str, min_len: usize) -> Result<()> {
    if name.chars().count() < min_len {
        return Err(Error::Validation(format!(
            "Container name must be at least {min_len} characters long."
        )));
    }
    Ok(())
}

fn looks_like_repo_url(url: &str) -> bool {
    url.starts_with("http://")
        || url.starts_with("https://")
        || url.starts_with("ssh://")
        || url.starts_with("git@")
}

fn is_valid_branch(branch: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").expect("valid regex");
    re.is_match(branch) && !branch.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> NameLengthLimits {
        NameLengthLimits::default()
    }

    fn parse(name: &str, args: &str) -> Result<Option<Command>> {
        Command::parse(name, args, &limits(), 10)
    }

    fn validation_msg(res: Result<Option<Command>>) -> String {
        match res {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn split_command_handles_bot_suffix_and_case() {
        assert_eq!(
            split_command("/Stop@MyBot web-app"),
            Some(("stop".to_string(), "web-app".to_string()))
        );
        assert_eq!(
            split_command("/list"),
            Some(("list".to_string(), String::new()))
        );
        assert_eq!(split_command("hello there"), None);
        assert_eq!(split_command("  /help  "), Some(("help".to_string(), String::new())));
    }

    #[test]
    fn unknown_command_is_ignored() {
        assert_eq!(parse("restart", "web").unwrap(), None);
    }

    #[test]
    fn stop_all_bypasses_length_check() {
        assert_eq!(
            parse("stop", "all").unwrap(),
            Some(Command::Stop {
                target: StopTarget::All
            })
        );
    }

    #[test]
    fn stop_rejects_short_names() {
        let msg = validation_msg(parse("stop", "ab"));
        assert_eq!(msg, "Container name must be at least 3 characters long.");
    }

    #[test]
    fn stop_without_args_explains_usage() {
        let msg = validation_msg(parse("stop", ""));
        assert_eq!(
            msg,
            "Please provide a container name to stop or use 'all' to stop all containers."
        );
    }

    #[test]
    fn start_accepts_any_nonempty_name() {
        assert_eq!(
            parse("start", "db").unwrap(),
            Some(Command::Start {
                name: "db".to_string()
            })
        );
        let msg = validation_msg(parse("start", ""));
        assert_eq!(msg, "Please provide a container name to start.");
    }

    #[test]
    fn delete_rejects_short_names() {
        let msg = validation_msg(parse("del", "abcd"));
        assert_eq!(msg, "Container name must be at least 5 characters long.");
        assert_eq!(
            parse("del", "abcde").unwrap(),
            Some(Command::Delete {
                name: "abcde".to_string()
            })
        );
    }

    #[test]
    fn logs_parses_tail_flag() {
        assert_eq!(
            parse("logs", "web-app -n 25").unwrap(),
            Some(Command::Logs {
                name: "web-app".to_string(),
                tail: 25,
                warning: None,
            })
        );
    }

    #[test]
    fn logs_defaults_tail_when_flag_absent() {
        assert_eq!(
            parse("logs", "web-app").unwrap(),
            Some(Command::Logs {
                name: "web-app".to_string(),
                tail: 10,
                warning: None,
            })
        );
    }

    #[test]
    fn logs_warns_on_unparsable_tail() {
        let cmd = parse("logs", "web-app -n abc").unwrap().unwrap();
        match cmd {
            Command::Logs { name, tail, warning } => {
                assert_eq!(name, "web-app");
                assert_eq!(tail, 10);
                assert_eq!(
                    warning.as_deref(),
                    Some("Invalid number of lines. Using default of 10 lines.")
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn logs_negative_tail_is_unparsable() {
        let cmd = parse("logs", "web-app -n -5").unwrap().unwrap();
        match cmd {
            Command::Logs { tail, warning, .. } => {
                assert_eq!(tail, 10);
                assert!(warning.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn logs_trailing_flag_uses_default_silently() {
        assert_eq!(
            parse("logs", "web-app -n").unwrap(),
            Some(Command::Logs {
                name: "web-app".to_string(),
                tail: 10,
                warning: None,
            })
        );
    }

    #[test]
    fn logs_without_args_explains_usage() {
        let msg = validation_msg(parse("logs", ""));
        assert_eq!(
            msg,
            "Please provide a container name to get logs. \
             Use /logs <container_name> -n <number_of_lines>."
        );
    }

    #[test]
    fn compose_requires_url_and_branch() {
        assert_eq!(
            validation_msg(parse("compose", "https://example.com/repo.git")),
            "Usage: /compose <repo_url> <branch>"
        );
        assert_eq!(
            parse("compose", "https://example.com/repo.git main").unwrap(),
            Some(Command::Compose {
                repo_url: "https://example.com/repo.git".to_string(),
                branch: "main".to_string(),
            })
        );
    }

    #[test]
    fn compose_rejects_bad_url_and_branch() {
        let msg = validation_msg(parse("compose", "ftp://example.com/repo.git main"));
        assert!(msg.contains("does not look like a repository URL"));

        let msg = validation_msg(parse("compose", "https://example.com/repo.git ../evil"));
        assert!(msg.contains("is not a valid branch name"));

        let msg = validation_msg(parse("compose", "https://example.com/repo.git feat..ure"));
        assert!(msg.contains("is not a valid branch name"));
    }

    #[test]
    fn compose_accepts_common_branch_shapes() {
        for branch in ["main", "release/1.2", "feat-x", "v1.0.3"] {
            assert!(
                parse("compose", &format!("git@host:repo.git {branch}")).is_ok(),
                "branch {branch} should parse"
            );
        }
    }

    #[test]
    fn container_target_covers_single_name_commands() {
        let cmd = parse("stop", "web-app").unwrap().unwrap();
        assert_eq!(cmd.container_target(), Some("web-app"));

        let cmd = parse("stop", "all").unwrap().unwrap();
        assert_eq!(cmd.container_target(), None);

        let cmd = parse("logs", "web-app").unwrap().unwrap();
        assert_eq!(cmd.container_target(), Some("web-app"));

        assert_eq!(Command::Help.container_target(), None);
    }
}
