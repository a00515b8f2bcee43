use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use crate::domain::UserId;

// ============== Rate Limiter (Per-User Cooldown) ==============

/// Limits each user to one accepted message per cooldown window.
///
/// The map is bounded: once it grows past `max_entries`, expired entries are
/// dropped, then the oldest live ones.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    window: Duration,
    max_entries: usize,
    last_accepted: HashMap<UserId, Instant>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_entries: usize) -> Self {
        Self {
            window,
            max_entries: max_entries.max(1),
            last_accepted: HashMap::new(),
        }
    }

    /// Returns `true` and records the acceptance when the user is allowed to
    /// act now. Denied calls leave the stored timestamp untouched.
    pub fn allow(&mut self, user_id: UserId) -> bool {
        self.allow_at(user_id, Instant::now())
    }

    pub fn allow_at(&mut self, user_id: UserId, now: Instant) -> bool {
        if let Some(&last) = self.last_accepted.get(&user_id) {
            if now.duration_since(last) <= self.window {
                return false;
            }
        }

        self.last_accepted.insert(user_id, now);
        if self.last_accepted.len() > self.max_entries {
            self.evict(now);
        }
        true
    }

    fn evict(&mut self, now: Instant) {
        // Expired entries behave exactly like absent ones, so they go first.
        let window = self.window;
        self.last_accepted
            .retain(|_, &mut last| now.duration_since(last) <= window);

        // If everything is still fresh, drop the oldest entries instead.
        while self.last_accepted.len() > self.max_entries {
            let Some((&user, _)) = self.last_accepted.iter().min_by_key(|&(_, last)| last) else {
                break;
            };
            self.last_accepted.remove(&user);
        }
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.last_accepted.len()
    }
}

// ============== Skip List ==============

/// Container names the bot must never touch.
#[derive(Clone, Debug, Default)]
pub struct SkipList {
    names: HashSet<String>,
}

impl SkipList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
