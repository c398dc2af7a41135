//! Memoizer for asynchronous backend queries.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use super::clock::{to_delta, Clock, SystemClock};
use super::QueryCacheConfig;

type ErasedValue = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct QueryEntry {
    value: ErasedValue,
    timestamp: DateTime<Utc>,
    ttl: Duration,
}

impl QueryEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) < to_delta(self.ttl)
    }

    /// Older than its TTL. An entry aged exactly its TTL is a miss but not yet stale.
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) > to_delta(self.ttl)
    }
}

/// Diagnostic snapshot of a [`QueryCache`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QueryCacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

/// Caches the results of async producers by an explicit key.
///
/// There is no in-flight tracking: two callers missing on the same key at
/// the same time both run their producer, and whichever finishes last wins
/// the slot. Callers that need single-flight must coordinate themselves.
///
/// Values of any `Clone + Send + Sync` type can share one cache. Reading a
/// key back as a different type than it was stored with counts as a miss.
pub struct QueryCache {
    entries: DashMap<String, QueryEntry>,
    config: QueryCacheConfig,
    clock: Arc<dyn Clock>,
}

impl QueryCache {
    pub fn new(config: QueryCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: QueryCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock,
        }
    }

    /// Return the cached result for `key`, or run `producer` and cache its output.
    ///
    /// `ttl` defaults to the configured lifetime. Producer errors are returned
    /// as-is and nothing is cached for them.
    pub async fn cached_query<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup::<T>(key) {
            debug!("Query '{}' served from cache", key);
            return Ok(value);
        }

        let value = producer().await?;

        self.entries.insert(
            key.to_string(),
            QueryEntry {
                value: Arc::new(value.clone()),
                timestamp: self.clock.now(),
                ttl: ttl.unwrap_or(self.config.default_ttl),
            },
        );

        Ok(value)
    }

    /// Live value for `key` if one of type `T` is stored.
    fn lookup<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        if !entry.is_live(now) {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Drop entries older than their own TTL. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale(now));
        before.saturating_sub(self.entries.len())
    }

    /// Forget `key`.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Forget every key starting with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> QueryCacheStats {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();

        QueryCacheStats {
            size: keys.len(),
            keys,
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("size", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}
