//! Cache configuration.
//!
//! Controls the shared cache store and the response-cache TTLs via `brezza.toml`.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_POSTS_TTL_SECONDS: u64 = 600;
const DEFAULT_COMMENTS_TTL_SECONDS: u64 = 300;

/// Cache configuration from `brezza.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; off means every lookup is a miss and no writes happen.
    pub enabled: bool,
    /// TTL for cached post listing and detail responses.
    pub posts_ttl_seconds: u64,
    /// TTL for cached comment listing responses.
    pub comments_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            posts_ttl_seconds: DEFAULT_POSTS_TTL_SECONDS,
            comments_ttl_seconds: DEFAULT_COMMENTS_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            posts_ttl_seconds: settings.posts_ttl_seconds.get(),
            comments_ttl_seconds: settings.comments_ttl_seconds.get(),
        }
    }
}

impl CacheConfig {
    pub fn posts_ttl(&self) -> Duration {
        Duration::from_secs(self.posts_ttl_seconds)
    }

    pub fn comments_ttl(&self) -> Duration {
        Duration::from_secs(self.comments_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.posts_ttl_seconds, 600);
        assert_eq!(config.comments_ttl_seconds, 300);
    }

    #[test]
    fn ttl_helpers_convert_to_durations() {
        let config = CacheConfig {
            enabled: true,
            posts_ttl_seconds: 10,
            comments_ttl_seconds: 5,
        };
        assert_eq!(config.posts_ttl(), Duration::from_secs(10));
        assert_eq!(config.comments_ttl(), Duration::from_secs(5));
    }
}
