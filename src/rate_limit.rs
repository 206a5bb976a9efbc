use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

/// Sliding window in-memory rate limiter (pod local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled { return true; }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window { entry.pop_front(); } else { break; }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action budgets derived from env.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub signup_limit: usize,
    pub signup_window: Duration,
    pub startalk_limit: usize,
    pub startalk_window: Duration,
    pub application_limit: usize,
    pub application_window: Duration,
    pub message_limit: usize,
    pub message_window: Duration,
    pub upload_limit: usize,
    pub upload_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize { std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default) }
        fn dur_env(name: &str, default: u64) -> Duration { Duration::from_secs(std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)) }
        Self {
            signup_limit: usize_env("RL_SIGNUP_LIMIT", 5),
            signup_window: dur_env("RL_SIGNUP_WINDOW", 3600),
            startalk_limit: usize_env("RL_STARTALK_LIMIT", 10),
            startalk_window: dur_env("RL_STARTALK_WINDOW", 300),
            application_limit: usize_env("RL_APPLICATION_LIMIT", 10),
            application_window: dur_env("RL_APPLICATION_WINDOW", 3600),
            message_limit: usize_env("RL_MESSAGE_LIMIT", 60),
            message_window: dur_env("RL_MESSAGE_WINDOW", 60),
            upload_limit: usize_env("RL_UPLOAD_LIMIT", 5),
            upload_window: dur_env("RL_UPLOAD_WINDOW", 3600),
        }
    }
}

/// High level guard used by handlers.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }
    pub fn allow_signup(&self, ip: &str) -> bool { self.limiter.check(&format!("signup:{ip}"), self.cfg.signup_limit, self.cfg.signup_window) }
    pub fn allow_startalk(&self, key: &str) -> bool { self.limiter.check(&format!("startalk:{key}"), self.cfg.startalk_limit, self.cfg.startalk_window) }
    pub fn allow_application(&self, key: &str) -> bool { self.limiter.check(&format!("application:{key}"), self.cfg.application_limit, self.cfg.application_window) }
    pub fn allow_message(&self, key: &str) -> bool { self.limiter.check(&format!("message:{key}"), self.cfg.message_limit, self.cfg.message_window) }
    pub fn allow_upload(&self, ip: &str) -> bool { self.limiter.check(&format!("upload:{ip}"), self.cfg.upload_limit, self.cfg.upload_window) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_basic() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_millis(50);
        for _ in 0..3 { assert!(rl.check("k", 3, window)); }
        assert!(!rl.check("k", 3, window));
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let rl = InMemoryRateLimiter::new(false);
        for _ in 0..100 { assert!(rl.check("k", 1, Duration::from_secs(60))); }
    }

    #[test]
    fn keys_are_independent() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_secs(60);
        assert!(rl.check("a", 1, window));
        assert!(!rl.check("a", 1, window));
        assert!(rl.check("b", 1, window));
    }
}
