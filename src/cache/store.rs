//! TTL + tag cache store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::clock::{add_duration, Clock, SystemClock};
use super::CacheConfig;

/// Capacity eviction removes one fifth of `max_entries`, rounded up.
const EVICTION_DIVISOR: usize = 5;

/// Shortest TTL an entry can carry, so `expires_at > created_at` always holds.
const MIN_TTL: Duration = Duration::from_millis(1);

/// Per-call options for [`CacheStore::set`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Overrides the store's default TTL.
    pub ttl: Option<Duration>,
    /// Labels for bulk invalidation via [`CacheStore::revalidate_tag`].
    pub tags: Vec<String>,
}

impl SetOptions {
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// A stored value with its lifetime and labels.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    tags: HashSet<String>,
    /// Insertion order, breaks `created_at` ties during eviction.
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

struct StoreInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
}

/// Diagnostic snapshot of a [`CacheStore`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_entries: usize,
    pub keys: Vec<String>,
}

/// Key/value store with TTL expiry, tag invalidation and a hard capacity.
///
/// Expired entries are removed lazily when read and in bulk by [`cleanup`].
/// A miss is never an error: every lookup returns `Option`.
///
/// [`cleanup`]: CacheStore::cleanup
pub struct CacheStore<V> {
    inner: Mutex<StoreInner<V>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> CacheStore<V> {
    /// Create a store on the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store reading time from `clock`.
    pub fn with_clock(mut config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        config.max_entries = config.max_entries.max(1);
        Self {
            inner: Mutex::new(StoreInner {
                entries: HashMap::with_capacity(config.max_entries),
                next_seq: 0,
            }),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up `key`. An expired entry is deleted and reported absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let entry = inner.entries.get(key)?;
        if !entry.is_expired(now) {
            return Some(entry.value.clone());
        }

        inner.entries.remove(key);
        debug!("Cache entry '{}' expired on read", key);
        None
    }

    /// Whether `key` holds a live entry. Same lazy-expiry rules as [`get`](Self::get).
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };
        if expired {
            inner.entries.remove(key);
        }
        !expired
    }

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// A full store runs [`cleanup`](Self::cleanup) first, even when `key` is
    /// already present, so the size never exceeds `max_entries` once `set` returns.
    pub fn set(&self, key: impl Into<String>, value: V, options: SetOptions) {
        let key = key.into();
        let now = self.clock.now();
        let ttl = options.ttl.unwrap_or(self.config.default_ttl).max(MIN_TTL);

        let mut inner = self.inner.lock();

        if inner.entries.len() >= self.config.max_entries {
            let removed = self.cleanup_locked(&mut inner, now);
            debug!("Cache full, sweep before insert removed {} entries", removed);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;

        inner.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: add_duration(now, ttl),
                tags: options.tags.into_iter().collect(),
                seq,
            },
        );
    }

    /// Remove `key`. Returns `true` if an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    /// Drop every entry carrying `tag`. Returns how many were removed.
    pub fn revalidate_tag(&self, tag: &str) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.tags.contains(tag));
        let removed = before - inner.entries.len();

        if removed > 0 {
            debug!("Revalidated tag '{}': {} entries dropped", tag, removed);
        }
        removed
    }

    /// [`revalidate_tag`](Self::revalidate_tag) for several tags at once.
    pub fn revalidate_tags<I, S>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .map(|tag| self.revalidate_tag(tag.as_ref()))
            .sum()
    }

    /// Sweep the store. Returns the number of entries removed.
    ///
    /// Expired entries go first. If the store is still at capacity afterwards,
    /// the oldest `ceil(max_entries / 5)` entries by creation time are evicted.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.cleanup_locked(&mut inner, now)
    }

    fn cleanup_locked(&self, inner: &mut StoreInner<V>, now: DateTime<Utc>) -> usize {
        let before = inner.entries.len();

        inner.entries.retain(|_, entry| entry.expires_at >= now);

        if inner.entries.len() >= self.config.max_entries {
            let evict = self.config.max_entries.div_ceil(EVICTION_DIVISOR);

            let mut by_age: Vec<(DateTime<Utc>, u64, String)> = inner
                .entries
                .iter()
                .map(|(key, entry)| (entry.created_at, entry.seq, key.clone()))
                .collect();
            by_age.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

            for (_, _, key) in by_age.into_iter().take(evict) {
                inner.entries.remove(&key);
            }
        }

        before - inner.entries.len()
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut keys: Vec<String> = inner.entries.keys().cloned().collect();
        keys.sort();

        CacheStats {
            size: inner.entries.len(),
            max_entries: self.config.max_entries,
            keys,
        }
    }
}

impl<V> std::fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("size", &self.inner.lock().entries.len())
            .field("config", &self.config)
            .finish()
    }
}
