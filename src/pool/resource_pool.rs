//! Keyed pool of reusable backend handles.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{HandleFactory, PoolConfig, SaturationPolicy, DEFAULT_KEY};
use crate::cache::{Clock, SystemClock};

struct PoolEntry<H> {
    handle: Arc<H>,
    created_at: DateTime<Utc>,
    /// Registration order, used for FIFO eviction.
    seq: u64,
}

struct PoolInner<H> {
    entries: HashMap<String, PoolEntry<H>>,
    max_connections: usize,
    next_seq: u64,
    /// Handles built over the pool's lifetime.
    connection_count: u64,
}

impl<H> PoolInner<H> {
    fn newest(&self) -> Option<&PoolEntry<H>> {
        self.entries.values().max_by_key(|entry| entry.seq)
    }
}

/// Diagnostic snapshot of a [`ResourcePool`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PoolStats {
    pub active_connections: usize,
    pub max_connections: usize,
    pub connection_count: u64,
}

/// Bounded, keyed pool of backend client handles.
///
/// Each role key (`"default"`, `"readonly"`, `"write"`, ...) maps to at most
/// one handle, built on first use by the injected [`HandleFactory`]. Handles
/// are shared as `Arc`s and never rebuilt while their key stays registered.
///
/// The pool does not queue or fail when full: see [`SaturationPolicy`].
/// Excess keys are only trimmed by [`cleanup`](Self::cleanup).
pub struct ResourcePool<F: HandleFactory> {
    factory: F,
    inner: Mutex<PoolInner<F::Handle>>,
    saturation: SaturationPolicy,
    clock: Arc<dyn Clock>,
}

impl<F: HandleFactory> ResourcePool<F> {
    pub fn new(config: PoolConfig, factory: F) -> Self {
        Self::with_clock(config, factory, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PoolConfig, factory: F, clock: Arc<dyn Clock>) -> Self {
        Self {
            factory,
            inner: Mutex::new(PoolInner {
                entries: HashMap::new(),
                max_connections: config.max_connections.max(1),
                next_seq: 0,
                connection_count: 0,
            }),
            saturation: config.saturation,
            clock,
        }
    }

    /// Get the handle for `key`, building it if needed.
    ///
    /// A registered key always gets its own handle back. A new key on a full
    /// pool is served according to the saturation policy. Otherwise the factory
    /// is called; its error is returned untouched and nothing is registered.
    pub fn acquire(&self, key: &str) -> Result<Arc<F::Handle>, F::Error> {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get(key) {
            return Ok(Arc::clone(&entry.handle));
        }

        if inner.entries.len() >= inner.max_connections {
            match self.saturation {
                SaturationPolicy::ShareExisting => {
                    if let Some(entry) = inner.newest() {
                        debug!("Pool saturated, sharing existing handle for '{}'", key);
                        return Ok(Arc::clone(&entry.handle));
                    }
                }
            }
        }

        let handle = Arc::new(self.factory.create(key)?);

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.connection_count += 1;
        inner.entries.insert(
            key.to_string(),
            PoolEntry {
                handle: Arc::clone(&handle),
                created_at: self.clock.now(),
                seq,
            },
        );

        info!("Created backend handle for '{}'", key);
        Ok(handle)
    }

    /// [`acquire`](Self::acquire) with the `"default"` role key.
    pub fn acquire_default(&self) -> Result<Arc<F::Handle>, F::Error> {
        self.acquire(DEFAULT_KEY)
    }

    /// Evict the oldest-registered keys beyond `max_connections`.
    ///
    /// Returns the number of keys removed. Callers still holding an evicted
    /// handle keep it alive until they drop it.
    pub fn cleanup(&self) -> usize {
        let mut inner = self.inner.lock();
        let excess = inner.entries.len().saturating_sub(inner.max_connections);
        if excess == 0 {
            return 0;
        }

        let mut by_age: Vec<(u64, String)> = inner
            .entries
            .iter()
            .map(|(key, entry)| (entry.seq, key.clone()))
            .collect();
        by_age.sort_unstable();

        for (_, key) in by_age.into_iter().take(excess) {
            if let Some(entry) = inner.entries.remove(&key) {
                debug!(
                    "Evicted backend handle '{}' (registered {})",
                    key, entry.created_at
                );
            }
        }

        excess
    }

    /// Change the cap. Shrinking takes effect on the next [`cleanup`](Self::cleanup).
    pub fn set_max_connections(&self, max_connections: usize) {
        let mut inner = self.inner.lock();
        let max_connections = max_connections.max(1);
        if max_connections < inner.entries.len() {
            warn!(
                "Pool cap lowered to {} with {} handles live, excess goes on next sweep",
                max_connections,
                inner.entries.len()
            );
        }
        inner.max_connections = max_connections;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Registered keys, oldest first.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut keys: Vec<(u64, String)> = inner
            .entries
            .iter()
            .map(|(key, entry)| (entry.seq, key.clone()))
            .collect();
        keys.sort_unstable();
        keys.into_iter().map(|(_, key)| key).collect()
    }

    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            active_connections: inner.entries.len(),
            max_connections: inner.max_connections,
            connection_count: inner.connection_count,
        }
    }
}

impl<F: HandleFactory> std::fmt::Debug for ResourcePool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ResourcePool")
            .field("active_connections", &inner.entries.len())
            .field("max_connections", &inner.max_connections)
            .field("saturation", &self.saturation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Stand-in for a backend client: remembers which role built it.
    #[derive(Debug)]
    struct FakeClient {
        role: String,
    }

    fn pool(
        max_connections: usize,
    ) -> ResourcePool<impl HandleFactory<Handle = FakeClient, Error = String>> {
        ResourcePool::new(
            PoolConfig::with_max_connections(max_connections),
            |key: &str| -> Result<FakeClient, String> {
                Ok(FakeClient {
                    role: key.to_string(),
                })
            },
        )
    }

    #[test]
    fn test_acquire_is_idempotent_per_key() {
        let pool = pool(5);

        let first = pool.acquire("a").unwrap();
        assert_eq!(pool.stats().active_connections, 1);

        let second = pool.acquire("a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.stats().active_connections, 1);
        assert_eq!(pool.stats().connection_count, 1);
    }

    #[test]
    fn test_acquire_default_key() {
        let pool = pool(5);
        let handle = pool.acquire_default().unwrap();

        assert_eq!(handle.role, "default");
        assert!(pool.contains("default"));
    }

    #[test]
    fn test_saturation_shares_existing_handle() {
        let pool = pool(2);
        pool.acquire("a").unwrap();
        let b = pool.acquire("b").unwrap();

        let c = pool.acquire("c").unwrap();

        assert!(Arc::ptr_eq(&b, &c));
        assert!(!pool.contains("c"));
        assert_eq!(pool.stats().active_connections, 2);
        assert_eq!(pool.stats().connection_count, 2);
    }

    #[test]
    fn test_cleanup_is_noop_within_cap() {
        let pool = pool(3);
        pool.acquire("a").unwrap();
        pool.acquire("b").unwrap();

        assert_eq!(pool.cleanup(), 0);
        assert_eq!(pool.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_cleanup_evicts_oldest_after_shrink() {
        let pool = pool(4);
        for key in ["a", "b", "c", "d"] {
            pool.acquire(key).unwrap();
        }

        pool.set_max_connections(2);
        assert_eq!(pool.stats().active_connections, 4);

        assert_eq!(pool.cleanup(), 2);
        assert_eq!(pool.keys(), vec!["c", "d"]);
        assert!(pool.stats().active_connections <= pool.stats().max_connections);
    }

    #[test]
    fn test_evicted_key_is_rebuilt() {
        let pool = pool(2);
        let old = pool.acquire("a").unwrap();
        pool.acquire("b").unwrap();
        pool.set_max_connections(1);
        pool.cleanup();

        pool.set_max_connections(2);
        let rebuilt = pool.acquire("a").unwrap();

        assert!(!Arc::ptr_eq(&old, &rebuilt));
        assert_eq!(pool.stats().connection_count, 3);
    }

    #[test]
    fn test_factory_error_surfaces_and_registers_nothing() {
        let pool = ResourcePool::new(PoolConfig::default(), |_: &str| -> Result<FakeClient, String> {
            Err("invalid credentials".to_string())
        });

        let err = pool.acquire("default").unwrap_err();

        assert_eq!(err, "invalid credentials");
        assert_eq!(pool.stats().active_connections, 0);
        assert_eq!(pool.stats().connection_count, 0);
    }

    #[test]
    fn test_factory_called_once_per_key() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let pool = ResourcePool::new(PoolConfig::default(), move |key: &str| -> Result<FakeClient, String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(FakeClient {
                role: key.to_string(),
            })
        });

        for _ in 0..3 {
            pool.acquire("readonly").unwrap();
            pool.acquire("write").unwrap();
        }

        assert_eq!(built.load(Ordering::SeqCst), 2);
    }
}
