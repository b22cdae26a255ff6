//! # Cart Endpoints
//!
//! Handlers for cart mutations and reads. Every response carries totals
//! recomputed by the cart store from the full record, and an update against
//! a product that is not in the cart returns 404 with the cart's actual
//! state so the client can reconcile.

use super::{id_from_value, AppState};
use crate::cart::{CartAction, CartError};
use crate::core::error::ServiceError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};

/// Body shared by the cart mutation endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationRequest {
    pub product_id: Option<Value>,
    pub session_id: Option<Value>,
    pub action: Option<String>,
}

/// Validate the two fields every cart mutation requires
fn require_ids(body: &CartMutationRequest) -> Result<(String, String), ServiceError> {
    let product_id = body
        .product_id
        .as_ref()
        .and_then(id_from_value)
        .ok_or_else(|| ServiceError::validation("productId", "productId and sessionId are required"))?;

    let session_id = body
        .session_id
        .as_ref()
        .and_then(id_from_value)
        .ok_or_else(|| ServiceError::validation("sessionId", "productId and sessionId are required"))?;

    Ok((product_id, session_id))
}

/// `POST /cart/add`
pub async fn add_to_cart(
    State(state): State<AppState>,
    Json(body): Json<CartMutationRequest>,
) -> Result<Json<Value>, ServiceError> {
    let (product_id, session_id) = require_ids(&body)?;

    let summary = state.cart.add(&session_id, &product_id).await?;

    Ok(Json(json!({
        "success": true,
        "productId": product_id,
        "totalCartQuantity": summary.total_quantity,
        "itemsCount": summary.items_count,
    })))
}

/// `GET /cart/:session_id`
pub async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ServiceError> {
    let session_id = session_id.trim().to_string();
    if session_id.is_empty() {
        return Err(ServiceError::validation("sessionId", "sessionId is required"));
    }

    let summary = state.cart.get(&session_id).await?;
    Ok(Json(summary).into_response())
}

/// `POST /cart/remove`
pub async fn remove_from_cart(
    State(state): State<AppState>,
    Json(body): Json<CartMutationRequest>,
) -> Result<Json<Value>, ServiceError> {
    let (product_id, session_id) = require_ids(&body)?;

    let (_removed, summary) = state.cart.remove(&session_id, &product_id).await?;

    Ok(Json(json!({
        "success": true,
        "removedProductId": product_id,
        "totalQuantity": summary.total_quantity,
        "itemsCount": summary.items_count,
    })))
}

/// `POST /cart/update`
pub async fn update_cart(
    State(state): State<AppState>,
    Json(body): Json<CartMutationRequest>,
) -> Result<Response, ServiceError> {
    let (product_id, session_id) = require_ids(&body)?;

    let action = body
        .action
        .as_deref()
        .and_then(CartAction::parse)
        .ok_or_else(|| {
            ServiceError::validation("action", "action must be one of increase, decrease")
        })?;

    match state.cart.update(&session_id, &product_id, action).await {
        Ok(update) => Ok(Json(json!({
            "success": true,
            "productId": update.product_id,
            "updatedQuantity": update.updated_quantity,
            "totalQuantity": update.summary.total_quantity,
            "itemsCount": update.summary.items_count,
        }))
        .into_response()),
        Err(CartError::NotInCart { product_id, summary }) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Product not found in cart",
                "productRemoved": true,
                "productId": product_id,
                "totalQuantity": summary.total_quantity,
                "itemsCount": summary.items_count,
            })),
        )
            .into_response()),
        Err(CartError::Storage(e)) => Err(e.into()),
    }
}
