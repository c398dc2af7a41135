//! Pool module - bounded reuse of backend client handles.
//!
//! Backend clients carry session and auth state and are expensive to build,
//! so the pool keeps one per role key and hands the same `Arc` back on every
//! `acquire`. Construction goes through a [`HandleFactory`]; the pool itself
//! knows nothing about the handle type.

mod config;
mod factory;
mod resource_pool;

pub use config::{PoolConfig, SaturationPolicy, DEFAULT_KEY, DEFAULT_MAX_CONNECTIONS};
pub use factory::HandleFactory;
pub use resource_pool::{PoolStats, ResourcePool};
