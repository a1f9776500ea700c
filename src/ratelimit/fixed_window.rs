//! Fixed-window rate limiter.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        remaining: u32,
        limit: u32,
        reset_at: i64,
    },
    /// Request is denied until the window resets
    Denied {
        retry_after: u64,
        limit: u32,
        reset_at: i64,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Per-caller window state.
///
/// Uses atomic operations for lock-free concurrent access. The window
/// roll is CAS-guarded so only one caller resets the counter.
struct WindowSlot {
    /// Window start (Unix milliseconds)
    window_start: AtomicI64,
    /// Calls counted in the current window
    count: AtomicU32,
}

impl WindowSlot {
    fn new(now: i64) -> Self {
        Self {
            window_start: AtomicI64::new(now),
            count: AtomicU32::new(0),
        }
    }
}

/// Fixed-window counter keyed by caller identity.
pub struct FixedWindowLimiter {
    windows: DashMap<String, WindowSlot>,
    config: RateLimitConfig,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get current time in milliseconds
    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    /// Count one call for `key` against the current window.
    pub fn check(&self, key: &str) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed {
                remaining: u32::MAX,
                limit: 0,
                reset_at: 0,
            };
        }

        let now = Self::now_millis();
        let window_ms = (self.config.window_seconds * 1000) as i64;
        let limit = self.config.max_requests;

        let slot = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowSlot::new(now));

        let start = slot.window_start.load(Ordering::Relaxed);
        if now - start >= window_ms {
            // Roll the window; a single CAS winner resets the counter
            if slot
                .window_start
                .compare_exchange(start, now, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                slot.count.store(0, Ordering::Relaxed);
            }
        }

        let window_start = slot.window_start.load(Ordering::Relaxed);
        let reset_at = window_start + window_ms;
        let used = slot.count.fetch_add(1, Ordering::Relaxed) + 1;

        if used <= limit {
            RateLimitResult::Allowed {
                remaining: limit - used,
                limit,
                reset_at,
            }
        } else {
            let retry_after = (((reset_at - now).max(0) as u64) / 1000).max(1);
            RateLimitResult::Denied {
                retry_after,
                limit,
                reset_at,
            }
        }
    }

    /// Drop windows idle longer than the configured TTL.
    pub fn cleanup_stale(&self) -> usize {
        let ttl_ms = (self.config.stale_after_seconds * 1000) as i64;
        let now = Self::now_millis();
        let before = self.windows.len();

        self.windows
            .retain(|_, slot| now - slot.window_start.load(Ordering::Relaxed) < ttl_ms);

        let removed = before - self.windows.len();
        if removed > 0 {
            tracing::debug!(removed = removed, "Cleaned up stale rate limit windows");
        }
        removed
    }
}
