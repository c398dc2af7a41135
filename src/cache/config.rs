//! Cache configuration.

use std::time::Duration;

/// Default lifetime of a cache entry: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Default capacity of the cache store.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Configuration for a [`CacheStore`](super::CacheStore).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries held at once.
    /// A `set` on a full store sweeps before inserting.
    pub max_entries: usize,

    /// Lifetime used when `set` is called without an explicit TTL.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given capacity.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Default::default()
        }
    }

    /// Set capacity (builder pattern).
    #[must_use]
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the default time-to-live.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Configuration for the [`QueryCache`](super::QueryCache).
#[derive(Debug, Clone)]
pub struct QueryCacheConfig {
    /// Lifetime used when `cached_query` is called without an explicit TTL.
    pub default_ttl: Duration,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl QueryCacheConfig {
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}
