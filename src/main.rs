//! # Shop Cache Service - Main Entry Point
//!
//! Startup sequence: observability, configuration, store clients, router,
//! then serve until SIGTERM/SIGINT. The Redis connection and the object
//! store HTTP client are built once here and shared by all requests; an
//! unreachable Redis fails startup with a non-zero exit.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use shop_cache::api::{build_router, AppState};
use shop_cache::cart::CartStore;
use shop_cache::core::error::{ServiceError, ServiceResult};
use shop_cache::storage::{HttpObjectStore, KeyValueStore, ObjectStore, RedisStore};
use shop_cache::video::{ResolverConfig, VideoResolver};
use shop_cache::ServiceConfig;

#[tokio::main]
async fn main() -> ServiceResult<()> {
    init_observability();

    info!("Starting shop cache service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("SHOP_CACHE_CONFIG_PATH")
        .unwrap_or_else(|_| "config/service.yaml".to_string());

    let config = ServiceConfig::load(&config_path).await.map_err(|e| {
        error!("Failed to load configuration from {}: {}", config_path, e);
        e
    })?;

    if let Err(e) = run(config).await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("Shop cache service shutdown complete");
    Ok(())
}

/// Initialize logging with an environment-driven filter
fn init_observability() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shop_cache=info,tower_http=debug".into()),
        )
        .init();
}

/// Build all components and serve until a shutdown signal arrives
async fn run(config: ServiceConfig) -> ServiceResult<()> {
    let kv: Arc<dyn KeyValueStore> = Arc::new(
        RedisStore::connect(config.redis.clone())
            .await
            .map_err(|e| ServiceError::internal(format!("Redis connection failed: {}", e)))?,
    );

    let objects: Arc<dyn ObjectStore> = Arc::new(
        HttpObjectStore::new(&config.object_store)
            .map_err(|e| ServiceError::internal(format!("Object store client failed: {}", e)))?,
    );

    let resolver = Arc::new(VideoResolver::new(
        kv.clone(),
        objects,
        ResolverConfig::from_service(&config),
    ));

    let cart = Arc::new(CartStore::new(kv.clone(), config.cart.ttl));

    let app = build_router(AppState { resolver, cart, kv });

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| ServiceError::internal(format!("Failed to bind to {}: {}", bind_addr, e)))?;

    info!("Shop cache service listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::internal(format!("Server error: {}", e)))?;

    Ok(())
}

/// Resolve when SIGTERM or SIGINT arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install SIGINT handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
