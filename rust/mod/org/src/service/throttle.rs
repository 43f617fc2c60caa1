use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Count-per-window rate limiter, tracked per caller key.
///
/// Applied independently to each of the expensive full-scan backup
/// operations. Anonymous callers share one key; the limit applies
/// regardless of authentication state.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt for `key`. Returns false when the caller has
    /// exhausted the window (the rejected attempt is not counted).
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap();
        let stamps = hits.entry(key.to_string()).or_default();
        stamps.retain(|t| now.duration_since(*t) < self.window);

        if stamps.len() >= self.limit as usize {
            return false;
        }
        stamps.push(now);
        true
    }
}
