//! Brezza cache system.
//!
//! Everything here sits on one key-value store and degrades to a no-op when
//! that store is unreachable:
//!
//! - **Response cache**: whole HTTP responses for read endpoints, keyed by
//!   the raw request URI
//! - **Rate limiting**: fixed windows counted in the store, failing open
//! - **Chat cache**: fingerprinted replies, session history, message ceiling
//! - **Invalidation**: pattern deletes fired after content mutations
//!
//! ## Configuration
//!
//! Behavior is controlled via `brezza.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! posts_ttl_seconds = 600
//! comments_ttl_seconds = 300
//! # ... see config.rs for all options
//! ```

pub mod backend;
mod chat;
mod config;
mod invalidation;
pub mod keys;
mod middleware;
mod rate_limit;
mod store;

pub use backend::{BackendError, KeyValueBackend, MemoryBackend};
pub use chat::{ChatCacheConfig, ChatCacheService, ChatEntry, ChatSender};
pub use config::CacheConfig;
pub use invalidation::CacheInvalidator;
pub use middleware::{
    CachedResponse, HEADER_CACHE_STATUS, ResponseCacheState, response_cache_layer,
};
pub use rate_limit::{
    HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, RateDecision, RateLimitConfig, RateLimiter,
    apply_headers,
};
pub use store::CacheStore;
