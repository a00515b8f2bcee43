use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{commands::NameLengthLimits, errors::Error, Result};

/// Typed configuration for the bot, sourced from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub containers_to_skip: Vec<String>,

    // Rate limiting
    pub command_cooldown: Duration,
    pub rate_limit_max_entries: usize,

    // Container engine
    pub stop_grace: Duration,
    pub default_log_tail: u32,
    pub name_limits: NameLengthLimits,

    // Compose stacks
    pub compose_work_dir: PathBuf,
    pub compose_keep_failed: bool,

    // Memory monitor
    pub memory_check_interval: Duration,
    pub memory_warn_percent: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let containers_to_skip = parse_csv(env_str("CONTAINERS_TO_SKIP"));

        // Rate limiting
        let command_cooldown = Duration::from_millis(env_u64("COMMAND_COOLDOWN_MS").unwrap_or(1000));
        let rate_limit_max_entries = env_usize("RATE_LIMIT_MAX_ENTRIES").unwrap_or(10_000).max(1);

        // Container engine
        let stop_grace = Duration::from_secs(env_u64("STOP_TIMEOUT_SECS").unwrap_or(10));
        let default_log_tail = env_u32("LOG_TAIL_DEFAULT").unwrap_or(10).max(1);

        // Per-command minimum name lengths. Defaults preserve the historical
        // per-command asymmetry.
        let defaults = NameLengthLimits::default();
        let name_limits = NameLengthLimits {
            start: env_usize("MIN_NAME_LEN_START").unwrap_or(defaults.start),
            stop: env_usize("MIN_NAME_LEN_STOP").unwrap_or(defaults.stop),
            logs: env_usize("MIN_NAME_LEN_LOGS").unwrap_or(defaults.logs),
            del: env_usize("MIN_NAME_LEN_DEL").unwrap_or(defaults.del),
        };

        // Compose stacks
        let compose_work_dir = PathBuf::from(
            env_str("COMPOSE_WORK_DIR").unwrap_or("/tmp/dockbot-compose".to_string()),
        );
        fs::create_dir_all(&compose_work_dir)?;
        let compose_keep_failed = env_bool("COMPOSE_KEEP_FAILED").unwrap_or(false);

        // Memory monitor. A zero interval would make the sampling loop spin.
        let memory_check_interval =
            Duration::from_secs(env_u64("MEMORY_CHECK_INTERVAL_SECS").unwrap_or(60).max(1));
        let memory_warn_percent = env_f64("MEMORY_WARN_PERCENT").unwrap_or(90.0);

        Ok(Self {
            telegram_bot_token,
            containers_to_skip,
            command_cooldown,
            rate_limit_max_entries,
            stop_grace,
            default_log_tail,
            name_limits,
            compose_work_dir,
            compose_keep_failed,
            memory_check_interval,
            memory_warn_percent,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    env_str(key).and_then(|s| s.trim().parse::<f64>().ok())
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
