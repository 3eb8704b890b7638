//! Cache key construction.
//!
//! Keys are colon-prefixed strings so one backend holds every cache concern
//! side by side. Response keys embed the raw request URI on purpose: two URLs
//! that differ only in query-parameter order cache separately, trading a
//! little duplication for zero canonicalization work on the hot path.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use uuid::Uuid;

/// Mount point of the versioned API, shared with the router.
pub const API_PREFIX: &str = "/api/v1";

pub const RESPONSE_PREFIX: &str = "response_cache:";
pub const RATE_LIMIT_PREFIX: &str = "rate_limit:";
pub const CHAT_RESPONSE_PREFIX: &str = "ai_response:";
pub const CHAT_SESSION_PREFIX: &str = "ai_session:";
pub const CHAT_RATE_PREFIX: &str = "ai_ratelimit:";

/// Key for a cached GET response, from the URI exactly as received.
pub fn response_key(raw_uri: &str) -> String {
    format!("{RESPONSE_PREFIX}{raw_uri}")
}

/// Counter key for one identity inside one fixed window. The window start is
/// part of the key, so stale windows age out by TTL instead of by reset logic.
pub fn rate_limit_key(scope: &str, identity: &str, window_start_ms: u64) -> String {
    format!("{RATE_LIMIT_PREFIX}{scope}:{identity}:{window_start_ms}")
}

pub fn chat_response_key(input: &str) -> String {
    format!("{CHAT_RESPONSE_PREFIX}{}", prompt_fingerprint(input))
}

pub fn chat_session_key(session_id: &str) -> String {
    format!("{CHAT_SESSION_PREFIX}{session_id}")
}

pub fn chat_rate_key(user_id: &str) -> String {
    format!("{CHAT_RATE_PREFIX}{user_id}")
}

/// Sixteen-character fingerprint of a normalized prompt: lower-cased,
/// trimmed, base64-encoded, truncated. Collisions are tolerable here; the
/// worst case is serving a cached answer for a prompt that shares a prefix
/// after normalization.
pub fn prompt_fingerprint(input: &str) -> String {
    let normalized = input.trim().to_lowercase();
    let encoded = STANDARD.encode(normalized.as_bytes());
    encoded.chars().take(16).collect()
}

// ============================================================================
// Invalidation patterns
// ============================================================================

/// Detail route for one post plus everything nested under it. Identifiers are
/// fixed-length UUIDs, so this prefix can never reach into another post.
pub fn post_detail_pattern(post_id: Uuid) -> String {
    format!("{RESPONSE_PREFIX}{API_PREFIX}/posts/{post_id}*")
}

/// The unparameterized listing key.
pub fn post_listing_exact() -> String {
    format!("{RESPONSE_PREFIX}{API_PREFIX}/posts")
}

/// Every listing variant that carries a query string.
pub fn post_listing_pattern() -> String {
    format!("{RESPONSE_PREFIX}{API_PREFIX}/posts?*")
}

/// Comment listings of one post, with or without query parameters.
pub fn post_comments_pattern(post_id: Uuid) -> String {
    format!("{RESPONSE_PREFIX}{API_PREFIX}/posts/{post_id}/comments*")
}
