//! Pattern-based invalidation fired after content writes.
//!
//! Invalidation is best effort by contract: a failed delete only means stale
//! responses survive until their TTL, so nothing here can fail a write that
//! already committed.

use std::sync::Arc;

use metrics::counter;
use tracing::debug;
use uuid::Uuid;

use super::keys;
use super::store::CacheStore;

const METRIC_INVALIDATED: &str = "brezza_cache_invalidated_total";

pub struct CacheInvalidator {
    store: Arc<CacheStore>,
}

impl CacheInvalidator {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Drops the cached detail of one post, everything nested under it, and
    /// every listing variant that could contain it. Other posts' detail keys
    /// are untouched.
    pub async fn invalidate_post(&self, post_id: Uuid) {
        let removed = self.store.delete_pattern(&keys::post_detail_pattern(post_id)).await
            + self.store.delete_pattern(&keys::post_listing_exact()).await
            + self.store.delete_pattern(&keys::post_listing_pattern()).await;

        counter!(METRIC_INVALIDATED).increment(removed);
        debug!(post_id = %post_id, removed, "post cache invalidated");
    }

    /// Drops the cached comment listings of one post.
    pub async fn invalidate_comments(&self, post_id: Uuid) {
        let removed = self
            .store
            .delete_pattern(&keys::post_comments_pattern(post_id))
            .await;

        counter!(METRIC_INVALIDATED).increment(removed);
        debug!(post_id = %post_id, removed, "comments cache invalidated");
    }
}
