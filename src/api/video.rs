//! # Video and Cache Endpoints
//!
//! Handlers for video URL resolution, the opaque product-list cache, and
//! video cache invalidation.

use super::{id_from_value, AppState};
use crate::core::error::ServiceError;
use crate::video::VideoSource;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Response for a single video resolution
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub product_id: String,
    pub video_url: Option<String>,
    pub cached: bool,
    pub source: VideoSource,
}

/// Batch resolution request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub product_ids: Option<Value>,
}

/// Product-list cache request body
#[derive(Debug, Deserialize)]
pub struct CacheProductsRequest {
    pub products: Option<Value>,
}

/// Cache invalidation request body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearVideosRequest {
    pub product_id: Option<Value>,
}

/// `GET /video/:product_id`
pub async fn get_video(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<VideoResponse>, ServiceError> {
    let product_id = product_id.trim().to_string();
    if product_id.is_empty() {
        return Err(ServiceError::validation("productId", "Product ID is required"));
    }

    let resolution = state.resolver.resolve(&product_id).await?;

    Ok(Json(VideoResponse {
        product_id: resolution.product_id,
        video_url: resolution.video_url,
        cached: resolution.cached,
        source: resolution.source,
    }))
}

/// `POST /videos/batch`
///
/// Elements resolve independently; a product that fails to resolve is
/// reported as `null`, never as a batch failure.
pub async fn batch_videos(
    State(state): State<AppState>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<Value>, ServiceError> {
    let ids = match body.product_ids {
        Some(Value::Array(ids)) => ids,
        _ => {
            return Err(ServiceError::validation(
                "productIds",
                "productIds must be an array",
            ))
        }
    };

    let product_ids: Vec<String> = ids.iter().filter_map(id_from_value).collect();
    let resolved = state.resolver.resolve_batch(product_ids).await;

    let mut videos = Map::new();
    for (product_id, video_url) in resolved {
        videos.insert(
            product_id,
            video_url.map(Value::String).unwrap_or(Value::Null),
        );
    }

    Ok(Json(json!({ "videos": videos })))
}

/// `POST /cache/products`
pub async fn cache_product_list(
    State(state): State<AppState>,
    Json(body): Json<CacheProductsRequest>,
) -> Result<Json<Value>, ServiceError> {
    let products = match body.products {
        Some(Value::Array(products)) => products,
        _ => {
            return Err(ServiceError::validation(
                "products",
                "products must be an array",
            ))
        }
    };

    state.resolver.store_product_list(&products).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Product list cached successfully",
        "ttl": state.resolver.product_list_ttl_secs(),
    })))
}

/// `GET /cache/products`
pub async fn get_cached_product_list(
    State(state): State<AppState>,
) -> Result<Json<Value>, ServiceError> {
    match state.resolver.cached_product_list().await? {
        Some(products) => Ok(Json(json!({
            "products": products,
            "cached": true,
            "source": "cache",
        }))),
        None => Ok(Json(json!({
            "products": Value::Null,
            "cached": false,
            "source": "not_cached",
        }))),
    }
}

/// `POST /cache/clear-videos`
///
/// With a `productId`, clears that product's entry; without one, clears
/// every video-related key by prefix scan.
pub async fn clear_video_caches(
    State(state): State<AppState>,
    body: Option<Json<ClearVideosRequest>>,
) -> Result<Json<Value>, ServiceError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let product_id = body.product_id.as_ref().and_then(id_from_value);

    state.resolver.invalidate(product_id.as_deref()).await?;

    let message = match product_id {
        Some(id) => format!("Cleared cache for product {}", id),
        None => "Cleared all video caches".to_string(),
    };

    Ok(Json(json!({ "success": true, "message": message })))
}
