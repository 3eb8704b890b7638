//! Shared cache store over the key-value backend.
//!
//! The store is the only path application code takes to the backend, and it
//! never surfaces a failure: a broken backend, a refused write, or an
//! undecodable value all collapse into "cache miss" semantics with a warning
//! in the log. Callers are written as if the cache may be empty at any time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::backend::KeyValueBackend;

const METRIC_CACHE_HIT: &str = "brezza_cache_hit_total";
const METRIC_CACHE_MISS: &str = "brezza_cache_miss_total";

pub struct CacheStore {
    backend: Arc<dyn KeyValueBackend>,
    enabled: bool,
    ready: AtomicBool,
}

impl CacheStore {
    /// A store starts not-ready; call [`connect`] once during startup.
    ///
    /// [`connect`]: CacheStore::connect
    pub fn new(backend: Arc<dyn KeyValueBackend>, enabled: bool) -> Self {
        Self {
            backend,
            enabled,
            ready: AtomicBool::new(false),
        }
    }

    /// Probes the backend once. A failed probe leaves the store not-ready,
    /// which turns every later operation into a miss or no-op.
    pub async fn connect(&self) {
        if !self.enabled {
            info!("cache disabled by configuration");
            return;
        }
        match self.backend.ping().await {
            Ok(()) => {
                self.ready.store(true, Ordering::Release);
                info!("cache backend connected");
            }
            Err(error) => {
                warn!(error = %error, "cache backend unreachable, serving without cache");
            }
        }
    }

    /// Stops touching the backend. Part of graceful shutdown.
    pub fn shutdown(&self) {
        self.ready.store(false, Ordering::Release);
        debug!("cache store shut down");
    }

    pub fn is_ready(&self) -> bool {
        self.enabled && self.ready.load(Ordering::Acquire)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_ready() {
            return None;
        }
        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT, "prefix" => prefix_label(key)).increment(1);
                    debug!(key, outcome = "hit", "cache read");
                    Some(value)
                }
                Err(error) => {
                    warn!(key, error = %error, "cached value does not decode, treating as miss");
                    None
                }
            },
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "prefix" => prefix_label(key)).increment(1);
                debug!(key, outcome = "miss", "cache read");
                None
            }
            Err(error) => {
                warn!(key, error = %error, "cache read failed");
                None
            }
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if !self.is_ready() {
            return;
        }
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(key, error = %error, "cache value does not serialize, skipping store");
                return;
            }
        };
        if let Err(error) = self.backend.set(key, raw, ttl).await {
            warn!(key, error = %error, "cache write failed");
        } else {
            debug!(key, ttl_secs = ttl.as_secs(), "cache write");
        }
    }

    /// Deletes every key matching the pattern, reporting how many went away.
    /// A backend failure reports zero; stale entries then age out by TTL.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        if !self.is_ready() {
            return 0;
        }
        let keys = match self.backend.keys(pattern).await {
            Ok(keys) => keys,
            Err(error) => {
                warn!(pattern, error = %error, "cache key scan failed");
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }
        match self.backend.delete(&keys).await {
            Ok(removed) => {
                debug!(pattern, removed, "cache keys deleted");
                removed
            }
            Err(error) => {
                warn!(pattern, error = %error, "cache delete failed");
                0
            }
        }
    }
}

fn prefix_label(key: &str) -> String {
    key.split_once(':')
        .map(|(prefix, _)| prefix)
        .unwrap_or("other")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::{BackendError, MemoryBackend};
    use async_trait::async_trait;

    struct DownBackend;

    #[async_trait]
    impl KeyValueBackend for DownBackend {
        async fn ping(&self) -> Result<(), BackendError> {
            Err(BackendError::unavailable("connection refused"))
        }
        async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
            Err(BackendError::unavailable("connection refused"))
        }
        async fn set(
            &self,
            _key: &str,
            _value: String,
            _ttl: Duration,
        ) -> Result<(), BackendError> {
            Err(BackendError::unavailable("connection refused"))
        }
        async fn keys(&self, _pattern: &str) -> Result<Vec<String>, BackendError> {
            Err(BackendError::unavailable("connection refused"))
        }
        async fn delete(&self, _keys: &[String]) -> Result<u64, BackendError> {
            Err(BackendError::unavailable("connection refused"))
        }
    }

    async fn connected_store() -> CacheStore {
        let store = CacheStore::new(Arc::new(MemoryBackend::new()), true);
        store.connect().await;
        store
    }

    #[tokio::test]
    async fn round_trips_json_values() {
        let store = connected_store().await;
        store
            .put_json("k", &vec![1u32, 2, 3], Duration::from_secs(60))
            .await;
        let got: Option<Vec<u32>> = store.get_json("k").await;
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let store = connected_store().await;
        let got: Option<String> = store.get_json("absent").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn undecodable_value_is_a_miss() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set("k", "not json at all".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let store = CacheStore::new(backend, true);
        store.connect().await;

        let got: Option<Vec<u32>> = store.get_json("k").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn disabled_store_never_touches_backend() {
        let store = CacheStore::new(Arc::new(DownBackend), false);
        store.connect().await;
        assert!(!store.is_ready());
        store.put_json("k", &1u32, Duration::from_secs(1)).await;
        assert_eq!(store.get_json::<u32>("k").await, None);
        assert_eq!(store.delete_pattern("*").await, 0);
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_misses() {
        let store = CacheStore::new(Arc::new(DownBackend), true);
        store.connect().await;
        assert!(!store.is_ready(), "failed probe keeps the store not-ready");

        store.put_json("k", &1u32, Duration::from_secs(1)).await;
        assert_eq!(store.get_json::<u32>("k").await, None);
        assert_eq!(store.delete_pattern("rate_limit:*").await, 0);
    }

    #[tokio::test]
    async fn shutdown_stops_backend_access() {
        let store = connected_store().await;
        store.put_json("k", &7u32, Duration::from_secs(60)).await;
        store.shutdown();
        assert!(!store.is_ready());
        assert_eq!(store.get_json::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn delete_pattern_reports_removed_count() {
        let store = connected_store().await;
        store.put_json("p:1", &1u32, Duration::from_secs(60)).await;
        store.put_json("p:2", &2u32, Duration::from_secs(60)).await;
        store.put_json("q:1", &3u32, Duration::from_secs(60)).await;

        assert_eq!(store.delete_pattern("p:*").await, 2);
        assert_eq!(store.get_json::<u32>("p:1").await, None);
        assert_eq!(store.get_json::<u32>("q:1").await, Some(3));
    }
}
