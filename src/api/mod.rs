//! # HTTP API Module
//!
//! Thin REST facade over the resolver and the cart store. Handlers do
//! request validation and response shaping only; every decision about
//! caching, TTLs, and fallbacks lives in the components behind them.

pub mod cart;
pub mod health;
pub mod video;

use crate::cart::CartStore;
use crate::storage::KeyValueStore;
use crate::video::VideoResolver;
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Video URL resolver
    pub resolver: Arc<VideoResolver>,

    /// Session cart store
    pub cart: Arc<CartStore>,

    /// Key-value store, used directly only by the health check
    pub kv: Arc<dyn KeyValueStore>,
}

/// Build the service router with tracing and CORS layers applied
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/video/:product_id", get(video::get_video))
        .route("/videos/batch", post(video::batch_videos))
        .route(
            "/cache/products",
            get(video::get_cached_product_list).post(video::cache_product_list),
        )
        .route("/cache/clear-videos", post(video::clear_video_caches))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/:session_id", get(cart::get_cart))
        .route("/cart/remove", post(cart::remove_from_cart))
        .route("/cart/update", post(cart::update_cart))
        .route("/health", get(health::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Extract an identifier from a JSON value that may be a string or a number
///
/// The storefront sends product ids both ways; everything else is invalid.
pub(crate) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_from_value() {
        assert_eq!(id_from_value(&json!("17")), Some("17".to_string()));
        assert_eq!(id_from_value(&json!(17)), Some("17".to_string()));
        assert_eq!(id_from_value(&json!("")), None);
        assert_eq!(id_from_value(&json!("   ")), None);
        assert_eq!(id_from_value(&json!(null)), None);
        assert_eq!(id_from_value(&json!(["nested"])), None);
    }
}
