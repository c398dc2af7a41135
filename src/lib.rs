//! Backend cache - in-process caching and pooling in front of MongoDB.
//!
//! ## Architecture
//!
//! - `cache` - TTL/tag `CacheStore` and the async `QueryCache` memoizer
//! - `pool` - bounded `ResourcePool` of backend client handles
//! - `database` - MongoDB handle factory for the pool
//! - `scheduler` - periodic cleanup sweeps for every store
//! - `service` - `CacheService`, the owned bundle handed to request handlers
//! - `diagnostics` - HTTP `/stats` and `/health`
//! - `config` - Environment configuration

pub mod cache;
pub mod config;
pub mod database;
pub mod diagnostics;
pub mod error;
pub mod pool;
pub mod scheduler;
pub mod service;

pub use cache::{CacheStore, QueryCache, SetOptions};
pub use config::Config;
pub use error::{BackendError, ConfigError};
pub use pool::{HandleFactory, ResourcePool};
pub use scheduler::{Scheduler, SweepIntervals};
pub use service::{CacheService, ServiceConfig};
