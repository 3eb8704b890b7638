//! Key-value backend contract and the in-process implementation.
//!
//! Every cached concern (responses, rate-limit counters, chat state) shares
//! one backend. Values are strings with a mandatory TTL; key patterns use `*`
//! as the only wildcard, matching any run of characters.

use std::io;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },
    #[error("backend io failure")]
    Io(#[from] io::Error),
    #[error("backend returned corrupt data for key `{key}`")]
    Corrupt { key: String },
}

impl BackendError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Contract every cache backend satisfies.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Connectivity probe used once at startup.
    async fn ping(&self) -> Result<(), BackendError>;

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), BackendError>;

    /// All live keys matching a `*` glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError>;

    /// Removes the given keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, BackendError>;
}

// ============================================================================
// MemoryBackend
// ============================================================================

struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process backend used by the production wiring and the test suite.
///
/// Entries expire lazily on read; the maintenance task calls [`sweep`] to
/// reclaim entries nothing reads again.
///
/// [`sweep`]: MemoryBackend::sweep
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, StoredValue>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Drops every expired entry and reports how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let now = Instant::now();
        if let Some(stored) = self.entries.get(key) {
            if stored.is_expired(now) {
                drop(stored);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(stored.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), BackendError> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let now = Instant::now();
        let matched = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now) && pattern_matches(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        Ok(matched)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, BackendError> {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Glob match where `*` spans any run of characters and everything else is
/// literal.
fn pattern_matches(pattern: &str, key: &str) -> bool {
    let mut segments = pattern.split('*');
    let first = segments.next().unwrap_or("");
    if !key.starts_with(first) {
        return false;
    }

    let mut rest = &key[first.len()..];
    let mut middle: Vec<&str> = segments.collect();
    let Some(last) = middle.pop() else {
        // No wildcard at all: the whole pattern is the literal prefix.
        return rest.is_empty();
    };

    for segment in middle {
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(idx) => rest = &rest[idx + segment.len()..],
            None => return false,
        }
    }

    last.is_empty() || rest.ends_with(last)
}
