//! Read-only HTTP diagnostics.
//!
//! - `GET /health` - liveness probe
//! - `GET /stats` - `stats()` of every store as JSON

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::pool::HandleFactory;
use crate::service::{CacheService, ServiceStats};

/// Build the diagnostics router over `service`.
pub fn router<V, F>(service: Arc<CacheService<V, F>>) -> Router
where
    V: Clone + Send + 'static,
    F: HandleFactory + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats::<V, F>))
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}

async fn stats<V, F>(State(service): State<Arc<CacheService<V, F>>>) -> Json<ServiceStats>
where
    V: Clone + Send + 'static,
    F: HandleFactory + 'static,
{
    Json(service.stats())
}

/// Serve `router` on `addr` until Ctrl+C.
///
/// # Errors
/// Returns error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Diagnostics listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SetOptions;
    use crate::service::ServiceConfig;

    fn factory(key: &str) -> Result<String, String> {
        Ok(key.to_string())
    }

    #[tokio::test]
    async fn test_stats_handler_reports_all_stores() {
        let service: Arc<CacheService<u32, _>> =
            Arc::new(CacheService::new(&ServiceConfig::default(), factory));
        service.cache().set("post:1", 1, SetOptions::default());
        service.pool().acquire("readonly").unwrap();

        let Json(snapshot) = stats(State(Arc::clone(&service))).await;

        assert_eq!(snapshot.cache.keys, vec!["post:1"]);
        assert_eq!(snapshot.pool.active_connections, 1);
        assert_eq!(snapshot.query.size, 0);
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await, "ok");
    }

    #[test]
    fn test_router_builds() {
        let service: Arc<CacheService<u32, _>> =
            Arc::new(CacheService::new(&ServiceConfig::default(), factory));
        let _router = router(service);
    }
}
