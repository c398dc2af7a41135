//! Cache service - owns one of each store.
//!
//! Request handlers receive an `Arc<CacheService>` instead of reaching for
//! process-wide statics, so tests and tenants can each build their own.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{
    CacheConfig, CacheStats, CacheStore, Clock, QueryCache, QueryCacheConfig, QueryCacheStats,
    SystemClock,
};
use crate::pool::{HandleFactory, PoolConfig, PoolStats, ResourcePool};

/// Settings for every store owned by a [`CacheService`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub pool: PoolConfig,
    pub query: QueryCacheConfig,
}

/// Combined diagnostics for all stores.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub cache: CacheStats,
    pub pool: PoolStats,
    pub query: QueryCacheStats,
}

/// The cache store, handle pool and query cache, sharing one clock.
pub struct CacheService<V, F: HandleFactory> {
    cache: Arc<CacheStore<V>>,
    pool: Arc<ResourcePool<F>>,
    queries: Arc<QueryCache>,
}

impl<V: Clone, F: HandleFactory> CacheService<V, F> {
    pub fn new(config: &ServiceConfig, factory: F) -> Self {
        Self::with_clock(config, factory, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &ServiceConfig, factory: F, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: Arc::new(CacheStore::with_clock(config.cache.clone(), Arc::clone(&clock))),
            pool: Arc::new(ResourcePool::with_clock(
                config.pool.clone(),
                factory,
                Arc::clone(&clock),
            )),
            queries: Arc::new(QueryCache::with_clock(config.query.clone(), clock)),
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore<V>> {
        &self.cache
    }

    pub fn pool(&self) -> &Arc<ResourcePool<F>> {
        &self.pool
    }

    pub fn queries(&self) -> &Arc<QueryCache> {
        &self.queries
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.cache.stats(),
            pool: self.pool.stats(),
            query: self.queries.stats(),
        }
    }
}

impl<V, F: HandleFactory> std::fmt::Debug for CacheService<V, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("cache", &self.cache)
            .field("pool", &self.pool)
            .field("queries", &self.queries)
            .finish()
    }
}
