//! # Cart Module
//!
//! Session shopping carts stored as grouped records in the key-value
//! store: one hash per session, product id as field, quantity as value.

pub mod store;

pub use store::{CartAction, CartItem, CartStore, CartSummary, CartUpdate};

use crate::storage::StorageError;

/// Cart operation errors
///
/// `NotInCart` carries the cart's current summary so callers can hand the
/// client reconciled totals alongside the 404.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("product {product_id} not found in cart")]
    NotInCart {
        product_id: String,
        summary: CartSummary,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
