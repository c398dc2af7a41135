//! Configuration module.
//!
//! Loads configuration from environment variables (after `.env`).

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheConfig, QueryCacheConfig};
use crate::error::ConfigError;
use crate::pool::PoolConfig;
use crate::scheduler::SweepIntervals;
use crate::service::ServiceConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Store capacities and TTLs.
    pub service: ServiceConfig,

    /// Background sweep periods.
    pub sweeps: SweepIntervals,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Where `/stats` and `/health` are served.
    pub stats_addr: SocketAddr,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns error if `MONGODB_URI` is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = SweepIntervals::default();

        let cache = CacheConfig::default()
            .max_entries(parse_or(&lookup, "CACHE_MAX_ENTRIES", CacheConfig::default().max_entries)?)
            .default_ttl(millis_or(&lookup, "CACHE_DEFAULT_TTL_MS", CacheConfig::default().default_ttl)?);

        let query = QueryCacheConfig::default().default_ttl(millis_or(
            &lookup,
            "QUERY_DEFAULT_TTL_MS",
            QueryCacheConfig::default().default_ttl,
        )?);

        let pool = PoolConfig::with_max_connections(parse_or(
            &lookup,
            "POOL_MAX_CONNECTIONS",
            PoolConfig::default().max_connections,
        )?);

        let sweeps = SweepIntervals {
            cache: secs_or(&lookup, "CACHE_SWEEP_SECS", defaults.cache)?,
            pool: secs_or(&lookup, "POOL_SWEEP_SECS", defaults.pool)?,
            query: secs_or(&lookup, "QUERY_SWEEP_SECS", defaults.query)?,
        };

        let mongodb_uri = lookup("MONGODB_URI")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("MONGODB_URI"))?;

        let mongodb_database = lookup("MONGODB_DATABASE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "app".to_string());

        let stats_addr = parse_or(
            &lookup,
            "STATS_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 8088)),
        )?;

        Ok(Self {
            service: ServiceConfig { cache, pool, query },
            sweeps,
            mongodb_uri,
            mongodb_database,
            stats_addr,
        })
    }
}

/// Parse `var` if set, otherwise fall back to `default`.
fn parse_or<L, T>(lookup: &L, var: &'static str, default: T) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn millis_or<L>(lookup: &L, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or(lookup, var, default_ms).map(Duration::from_millis)
}

fn secs_or<L>(lookup: &L, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    parse_or(lookup, var, default.as_secs()).map(Duration::from_secs)
}
