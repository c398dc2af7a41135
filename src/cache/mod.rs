//! Cache module - in-process caches in front of the backend.
//!
//! ## Architecture
//!
//! - `CacheStore` - key/value entries with TTL expiry, tag invalidation and
//!   a hard capacity. Expired entries are dropped lazily on read and in bulk
//!   by `cleanup()`.
//! - `QueryCache` - memoizes async producer calls by key with per-entry TTL.
//!   It has no tag support and sweeps on its own schedule.
//! - `Clock` - injectable time source so expiry can be driven from tests.
//!
//! ## Usage
//!
//! ```rust
//! use backend_cache::cache::{CacheConfig, CacheStore, SetOptions};
//!
//! let store: CacheStore<String> = CacheStore::new(CacheConfig::default());
//! store.set("post:1", "hello".to_string(), SetOptions::default().tag("posts"));
//! assert_eq!(store.get("post:1").as_deref(), Some("hello"));
//!
//! store.revalidate_tag("posts");
//! assert!(store.get("post:1").is_none());
//! ```

mod clock;
mod config;
mod query;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, QueryCacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use query::{QueryCache, QueryCacheStats};
pub use store::{CacheStats, CacheStore, SetOptions};
