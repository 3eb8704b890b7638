//! Chat caching: fingerprinted response reuse, capped session history, and a
//! per-user message ceiling, all living in the shared store.
//!
//! History is stored whole per session and rewritten on every append; the
//! cap keeps the payload small enough that this stays cheap. The message
//! ceiling refreshes its TTL on each increment, so the minute slides with
//! activity rather than snapping to wall-clock windows.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use super::keys;
use super::store::CacheStore;

const METRIC_CHAT_CACHE_HIT: &str = "brezza_chat_cache_hit_total";

const DEFAULT_RESPONSE_TTL_SECONDS: u64 = 3600;
const DEFAULT_SESSION_TTL_SECONDS: u64 = 7200;
const DEFAULT_HISTORY_LIMIT: usize = 20;
const DEFAULT_MESSAGE_LIMIT: u32 = 10;
const DEFAULT_MESSAGE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatCacheConfig {
    pub response_ttl_seconds: u64,
    pub session_ttl_seconds: u64,
    /// Most recent entries kept per session in the store.
    pub history_limit: usize,
    /// Messages one user may send per window.
    pub message_limit: u32,
    pub message_window_seconds: u64,
}

impl Default for ChatCacheConfig {
    fn default() -> Self {
        Self {
            response_ttl_seconds: DEFAULT_RESPONSE_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            message_window_seconds: DEFAULT_MESSAGE_WINDOW_SECONDS,
        }
    }
}

impl From<&crate::config::ChatSettings> for ChatCacheConfig {
    fn from(settings: &crate::config::ChatSettings) -> Self {
        Self {
            response_ttl_seconds: settings.response_ttl_seconds.get(),
            session_ttl_seconds: settings.session_ttl_seconds.get(),
            history_limit: settings.history_limit.get() as usize,
            message_limit: settings.message_limit.get(),
            message_window_seconds: settings.message_window_seconds.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatSender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub content: String,
    pub sender: ChatSender,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: ChatSender::User,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: ChatSender::Assistant,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

pub struct ChatCacheService {
    store: Arc<CacheStore>,
    config: ChatCacheConfig,
}

impl ChatCacheService {
    pub fn new(store: Arc<CacheStore>, config: ChatCacheConfig) -> Self {
        Self { store, config }
    }

    /// Cached reply for a prompt, keyed by its normalized fingerprint.
    pub async fn cached_response(&self, input: &str) -> Option<String> {
        let key = keys::chat_response_key(input);
        let hit: Option<String> = self.store.get_json(&key).await;
        if hit.is_some() {
            counter!(METRIC_CHAT_CACHE_HIT).increment(1);
            debug!(key, "chat response served from cache");
        }
        hit
    }

    pub async fn store_response(&self, input: &str, reply: &str) {
        self.store
            .put_json(
                &keys::chat_response_key(input),
                &reply,
                Duration::from_secs(self.config.response_ttl_seconds),
            )
            .await;
    }

    pub async fn history(&self, session_id: &str) -> Vec<ChatEntry> {
        self.store
            .get_json(&keys::chat_session_key(session_id))
            .await
            .unwrap_or_default()
    }

    /// Appends one entry, trimming to the configured cap and refreshing the
    /// session TTL.
    pub async fn append_history(&self, session_id: &str, entry: ChatEntry) {
        let key = keys::chat_session_key(session_id);
        let mut entries: Vec<ChatEntry> = self.store.get_json(&key).await.unwrap_or_default();
        entries.push(entry);

        let overflow = entries.len().saturating_sub(self.config.history_limit);
        if overflow > 0 {
            entries.drain(..overflow);
        }

        self.store
            .put_json(
                &key,
                &entries,
                Duration::from_secs(self.config.session_ttl_seconds),
            )
            .await;
    }

    /// Admits one message for the user, or reports that the ceiling is
    /// reached. With the backend away this always admits.
    pub async fn allow_message(&self, user_id: &str) -> bool {
        let key = keys::chat_rate_key(user_id);
        let count: u32 = self.store.get_json(&key).await.unwrap_or(0);
        if count >= self.config.message_limit {
            debug!(user_id, count, "chat message ceiling reached");
            return false;
        }
        self.store
            .put_json(
                &key,
                &(count + 1),
                Duration::from_secs(self.config.message_window_seconds),
            )
            .await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::MemoryBackend;

    async fn service() -> ChatCacheService {
        let store = Arc::new(CacheStore::new(Arc::new(MemoryBackend::new()), true));
        store.connect().await;
        ChatCacheService::new(store, ChatCacheConfig::default())
    }

    #[tokio::test]
    async fn response_cache_hits_on_normalized_equivalents() {
        let chat = service().await;
        assert_eq!(chat.cached_response("What is Rust?").await, None);

        chat.store_response("What is Rust?", "a systems language").await;
        assert_eq!(
            chat.cached_response("  what is rust?  ").await.as_deref(),
            Some("a systems language")
        );
        assert_eq!(chat.cached_response("what is go?").await, None);
    }

    #[tokio::test]
    async fn history_keeps_only_the_most_recent_entries() {
        let chat = service().await;
        for i in 0..25 {
            chat.append_history("s1", ChatEntry::user(format!("message {i}")))
                .await;
        }

        let history = chat.history("s1").await;
        assert_eq!(history.len(), 20);
        assert_eq!(history.first().unwrap().content, "message 5");
        assert_eq!(history.last().unwrap().content, "message 24");
    }

    #[tokio::test]
    async fn history_is_per_session() {
        let chat = service().await;
        chat.append_history("s1", ChatEntry::user("hello")).await;
        assert!(chat.history("s2").await.is_empty());
    }

    #[tokio::test]
    async fn message_ceiling_blocks_the_eleventh_message() {
        let chat = service().await;
        for _ in 0..10 {
            assert!(chat.allow_message("u1").await);
        }
        assert!(!chat.allow_message("u1").await);
        assert!(chat.allow_message("u2").await, "ceiling is per user");
    }

    #[tokio::test]
    async fn everything_fails_open_without_a_backend() {
        let store = Arc::new(CacheStore::new(Arc::new(MemoryBackend::new()), true));
        // Never connected.
        let chat = ChatCacheService::new(store, ChatCacheConfig::default());

        for _ in 0..50 {
            assert!(chat.allow_message("u1").await);
        }
        assert_eq!(chat.cached_response("anything").await, None);
        chat.append_history("s1", ChatEntry::user("hello")).await;
        assert!(chat.history("s1").await.is_empty());
    }
}
