//! Pool configuration.

/// Default cap on distinct live handles.
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

/// Role key used by [`ResourcePool::acquire_default`](super::ResourcePool::acquire_default).
pub const DEFAULT_KEY: &str = "default";

/// What `acquire` does for a new key once the pool is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaturationPolicy {
    /// Hand out an already registered handle instead of building a new one.
    /// The most recently registered handle is the one shared.
    #[default]
    ShareExisting,
}

/// Configuration for a [`ResourcePool`](super::ResourcePool).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of distinct keys holding a handle.
    pub max_connections: usize,

    /// Behaviour when a new key arrives at capacity.
    pub saturation: SaturationPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            saturation: SaturationPolicy::default(),
        }
    }
}

impl PoolConfig {
    pub fn with_max_connections(max_connections: usize) -> Self {
        Self {
            max_connections,
            ..Default::default()
        }
    }
}
