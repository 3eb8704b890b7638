//! Fixed-window rate limiting on top of the shared cache store.
//!
//! Each identity gets one counter per window; the window start is baked into
//! the key and the counter carries a TTL for the rest of the window, so
//! nothing ever needs an explicit reset. When the backend is away the store
//! reads zero and swallows writes, which makes the limiter fail open.
//!
//! Window starts are computed from this process's clock. With several
//! instances behind one backend, clock skew shifts which window a request
//! lands in but cannot corrupt counters, since skewed clocks simply address
//! different keys.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, HeaderValue, header};
use metrics::counter;
use serde::Deserialize;
use tracing::debug;

use super::keys;
use super::store::CacheStore;

const METRIC_RATE_LIMITED: &str = "brezza_rate_limited_total";

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

const DEFAULT_WINDOW_SECONDS: u64 = 60;
const DEFAULT_MAX_REQUESTS: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_seconds: u64,
    pub max_requests: u32,
    /// When set, responses with status 400 and above are rolled back out of
    /// the window afterwards.
    pub skip_failed: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            max_requests: DEFAULT_MAX_REQUESTS,
            skip_failed: false,
        }
    }
}

impl From<&crate::config::RateLimitSettings> for RateLimitConfig {
    fn from(settings: &crate::config::RateLimitSettings) -> Self {
        Self {
            window_seconds: settings.window_seconds.get(),
            max_requests: settings.max_requests.get(),
            skip_failed: settings.skip_failed,
        }
    }
}

/// Outcome of one admission check, with everything the HTTP layer needs for
/// the `x-ratelimit-*` and `retry-after` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix milliseconds at which the current window ends.
    pub reset_at_ms: u64,
    /// Whole seconds until the window ends; zero while allowed.
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    store: Arc<CacheStore>,
    scope: &'static str,
    window_ms: u64,
    max_requests: u32,
    skip_failed: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<CacheStore>, scope: &'static str, config: RateLimitConfig) -> Self {
        Self {
            store,
            scope,
            window_ms: Duration::from_secs(config.window_seconds).as_millis().max(1) as u64,
            max_requests: config.max_requests,
            skip_failed: config.skip_failed,
        }
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    pub fn forgives_failures(&self) -> bool {
        self.skip_failed
    }

    /// Admits or rejects one request for `identity` in the current window.
    pub async fn check(&self, identity: &str) -> RateDecision {
        self.check_at(identity, epoch_millis()).await
    }

    async fn check_at(&self, identity: &str, now_ms: u64) -> RateDecision {
        let window_start = (now_ms / self.window_ms) * self.window_ms;
        let reset_at_ms = window_start + self.window_ms;
        let key = keys::rate_limit_key(self.scope, identity, window_start);

        let count: u32 = self.store.get_json(&key).await.unwrap_or(0);
        if count >= self.max_requests {
            counter!(METRIC_RATE_LIMITED, "scope" => self.scope).increment(1);
            debug!(
                scope = self.scope,
                identity, count, "rate limit exceeded"
            );
            return RateDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_at_ms,
                retry_after_secs: (reset_at_ms - now_ms).div_ceil(1000).max(1),
            };
        }

        let ttl = remaining_window(now_ms, reset_at_ms);
        self.store.put_json(&key, &(count + 1), ttl).await;

        RateDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count + 1),
            reset_at_ms,
            retry_after_secs: 0,
        }
    }

    /// Rolls one admitted request back out of the current window. Best
    /// effort: during a backend outage the rollback is lost, which only
    /// under-counts.
    pub async fn forgive(&self, identity: &str) {
        self.forgive_at(identity, epoch_millis()).await;
    }

    async fn forgive_at(&self, identity: &str, now_ms: u64) {
        let window_start = (now_ms / self.window_ms) * self.window_ms;
        let key = keys::rate_limit_key(self.scope, identity, window_start);

        let count: u32 = self.store.get_json(&key).await.unwrap_or(0);
        if count == 0 {
            return;
        }
        let ttl = remaining_window(now_ms, window_start + self.window_ms);
        self.store.put_json(&key, &(count - 1), ttl).await;
    }
}

/// TTL for the rest of the window, floored at one second so a counter
/// written at the window's edge still lands.
fn remaining_window(now_ms: u64, reset_at_ms: u64) -> Duration {
    Duration::from_millis(reset_at_ms.saturating_sub(now_ms)).max(Duration::from_secs(1))
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Writes the rate-limit response headers for one decision.
pub fn apply_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert(HEADER_LIMIT, value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert(HEADER_REMAINING, value);
    }
    let reset_secs = decision.reset_at_ms / 1000;
    if let Ok(value) = HeaderValue::from_str(&reset_secs.to_string()) {
        headers.insert(HEADER_RESET, value);
    }
    if !decision.allowed {
        if let Ok(value) = HeaderValue::from_str(&decision.retry_after_secs.to_string()) {
            headers.insert(header::RETRY_AFTER, value);
        }
    }
}
