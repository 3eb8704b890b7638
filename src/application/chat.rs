//! Chat orchestration: message ceiling, fingerprinted response reuse, and a
//! small in-process session map that feeds recent context to the responder.
//!
//! Sessions here are deliberately not durable. The KV session history is the
//! record a client can fetch back; this map only exists so the responder sees
//! the last few exchanges without a store round trip.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::cache::{ChatCacheService, ChatEntry};

const SESSION_CAPACITY: usize = 10;
const SESSION_CONTEXT_LIMIT: usize = 10;
const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message rate limit reached")]
    RateLimited,
    #[error("responder failed: {0}")]
    Responder(String),
}

/// Produces the assistant reply for one message. The production wiring uses
/// [`EchoResponder`]; a model-backed client slots in behind the same trait.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, message: &str, context: &[ChatEntry]) -> Result<String, ChatError>;
}

pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn reply(&self, message: &str, _context: &[ChatEntry]) -> Result<String, ChatError> {
        Ok(format!("You said: {message}"))
    }
}

#[derive(Debug, Clone)]
struct SessionState {
    entries: Vec<ChatEntry>,
    last_active: Instant,
}

/// In-process session map, capped in size and context length.
pub struct ChatSessions {
    sessions: DashMap<String, SessionState>,
    capacity: usize,
    context_limit: usize,
    idle_limit: Duration,
}

impl ChatSessions {
    pub fn new() -> Self {
        Self::with_limits(SESSION_CAPACITY, SESSION_CONTEXT_LIMIT, SESSION_IDLE_LIMIT)
    }

    fn with_limits(capacity: usize, context_limit: usize, idle_limit: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity,
            context_limit,
            idle_limit,
        }
    }

    /// Appends one entry to the session, creating it if needed. A brand-new
    /// session at capacity evicts the least-recently-active one first.
    pub fn record(&self, session_id: &str, entry: ChatEntry) {
        if !self.sessions.contains_key(session_id) && self.sessions.len() >= self.capacity {
            self.evict_least_recently_active();
        }

        let mut state = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState {
                entries: Vec::new(),
                last_active: Instant::now(),
            });
        state.entries.push(entry);
        let overflow = state.entries.len().saturating_sub(self.context_limit);
        if overflow > 0 {
            state.entries.drain(..overflow);
        }
        state.last_active = Instant::now();
    }

    /// Most recent entries for the session, oldest first.
    pub fn context(&self, session_id: &str) -> Vec<ChatEntry> {
        self.sessions
            .get(session_id)
            .map(|state| state.entries.clone())
            .unwrap_or_default()
    }

    fn evict_least_recently_active(&self) {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().last_active)
            .map(|entry| entry.key().clone());
        if let Some(session_id) = oldest {
            self.sessions.remove(&session_id);
            debug!(session_id, "evicted idle chat session at capacity");
        }
    }

    /// Drops sessions idle longer than the configured limit and reports how
    /// many were removed. Driven by the maintenance task.
    pub fn sweep(&self) -> usize {
        self.sweep_older_than(self.idle_limit)
    }

    fn sweep_older_than(&self, idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, state| state.last_active.elapsed() < idle);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for ChatSessions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    pub cached: bool,
}

pub struct ChatService {
    cache: Arc<ChatCacheService>,
    sessions: Arc<ChatSessions>,
    responder: Arc<dyn Responder>,
}

impl ChatService {
    pub fn new(
        cache: Arc<ChatCacheService>,
        sessions: Arc<ChatSessions>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            cache,
            sessions,
            responder,
        }
    }

    /// Runs one message through the pipeline: ceiling check, history append,
    /// cached reply or responder call, assistant history append.
    pub async fn handle_message(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if !self.cache.allow_message(user_id).await {
            return Err(ChatError::RateLimited);
        }

        let user_entry = ChatEntry::user(message);
        self.sessions.record(session_id, user_entry.clone());
        self.cache.append_history(session_id, user_entry).await;

        let (reply, cached) = match self.cache.cached_response(message).await {
            Some(reply) => (reply, true),
            None => {
                let context = self.sessions.context(session_id);
                let reply = self.responder.reply(message, &context).await?;
                self.cache.store_response(message, &reply).await;
                (reply, false)
            }
        };

        let assistant_entry = ChatEntry::assistant(reply.clone());
        self.sessions.record(session_id, assistant_entry.clone());
        self.cache.append_history(session_id, assistant_entry).await;

        Ok(ChatReply { reply, cached })
    }

    /// Persisted history for a session, as the client can fetch it back.
    pub async fn history(&self, session_id: &str) -> Vec<ChatEntry> {
        self.cache.history(session_id).await
    }
}
