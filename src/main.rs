//! Backend cache service binary.
//!
//! Builds the cache service, verifies the backend is reachable, starts the
//! cleanup sweeps and serves diagnostics until Ctrl+C.

use std::sync::Arc;

use mongodb::bson::doc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use backend_cache::database::MongoFactory;
use backend_cache::{diagnostics, CacheService, Config, Scheduler};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Cached values are backend documents rendered as JSON.
type AppService = CacheService<serde_json::Value, MongoFactory>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("backend_cache=info,mongodb=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting backend cache...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!(
        "Cache capacity {}, default TTL {:?}, pool capacity {}",
        config.service.cache.max_entries,
        config.service.cache.default_ttl,
        config.service.pool.max_connections
    );

    let factory = MongoFactory::from_uri(&config.mongodb_uri, &config.mongodb_database).await?;
    let service: Arc<AppService> = Arc::new(CacheService::new(&config.service, factory));

    // A broken backend configuration must stop startup, not surface per request
    info!("Connecting to MongoDB...");
    let db = service.pool().acquire_default()?;
    db.run_command(doc! { "ping": 1 }).await?;
    info!("Database connected");

    // Lives until main returns
    let _scheduler = Scheduler::start(&service, config.sweeps);

    diagnostics::serve(config.stats_addr, diagnostics::router(Arc::clone(&service))).await?;

    info!("Backend cache stopped");
    Ok(())
}
