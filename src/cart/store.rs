//! # Cart Store
//!
//! Read-modify-write cart operations over one hash record per session.
//! Increments use the store's atomic field increment; totals are never
//! kept anywhere — every response recomputes them from a fresh read of
//! the full record, so they always equal the sum of the fields present.

use super::CartError;
use crate::storage::{KeyValueStore, StorageError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Key for a session's cart record
fn cart_key(session_id: &str) -> String {
    format!("cart_items:{}", session_id)
}

/// One product line in a cart
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u64,
}

/// Full cart contents plus recomputed totals
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartItem>,

    /// Sum of all quantities
    pub total_quantity: u64,

    /// Number of distinct products
    pub items_count: usize,
}

impl CartSummary {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_quantity: 0,
            items_count: 0,
        }
    }
}

/// Result of a quantity update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdate {
    pub product_id: String,

    /// Quantity after the update; 0 means the product was removed
    pub updated_quantity: u64,

    #[serde(flatten)]
    pub summary: CartSummary,
}

/// Direction of a quantity update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Increase,
    Decrease,
}

impl CartAction {
    /// Parse the wire representation; anything else is invalid input
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            _ => None,
        }
    }
}

/// Session cart store
pub struct CartStore {
    /// Key-value store holding cart records
    kv: Arc<dyn KeyValueStore>,

    /// Optional expiry refreshed on every mutation; `None` means carts
    /// persist until explicitly cleared
    ttl: Option<Duration>,
}

impl CartStore {
    /// Create a cart store over an injected key-value client
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Option<Duration>) -> Self {
        Self { kv, ttl }
    }

    /// Add one unit of a product, creating the line at quantity 1
    pub async fn add(&self, session_id: &str, product_id: &str) -> Result<CartSummary, StorageError> {
        let key = cart_key(session_id);

        self.kv.hincr(&key, product_id, 1).await?;
        self.refresh_expiry(&key).await;

        debug!("Added product {} to cart for session {}", product_id, session_id);
        self.summary(session_id).await
    }

    /// Read the full cart; an empty cart is an empty summary, not an error
    pub async fn get(&self, session_id: &str) -> Result<CartSummary, StorageError> {
        self.summary(session_id).await
    }

    /// Remove a product line entirely, whatever its quantity
    pub async fn remove(&self, session_id: &str, product_id: &str) -> Result<(bool, CartSummary), StorageError> {
        let key = cart_key(session_id);

        let removed = self.kv.hdel(&key, product_id).await?;
        self.refresh_expiry(&key).await;

        debug!("Removed product {} from cart for session {}", product_id, session_id);
        let summary = self.summary(session_id).await?;
        Ok((removed, summary))
    }

    /// Increase or decrease a product's quantity
    ///
    /// A product not currently in the cart yields `CartError::NotInCart`
    /// with the cart's actual, unaffected totals. Decreasing a quantity of
    /// 1 removes the line; a field never stores a non-positive quantity.
    pub async fn update(
        &self,
        session_id: &str,
        product_id: &str,
        action: CartAction,
    ) -> Result<CartUpdate, CartError> {
        let key = cart_key(session_id);

        let current: i64 = match self.kv.hget(&key, product_id).await? {
            Some(quantity) => quantity.parse().unwrap_or(0),
            None => 0,
        };

        if current <= 0 {
            let summary = self.summary(session_id).await?;
            return Err(CartError::NotInCart {
                product_id: product_id.to_string(),
                summary,
            });
        }

        let updated_quantity = match action {
            CartAction::Increase => self.kv.hincr(&key, product_id, 1).await?.max(0) as u64,
            CartAction::Decrease => {
                if current <= 1 {
                    self.kv.hdel(&key, product_id).await?;
                    0
                } else {
                    let updated = self.kv.hincr(&key, product_id, -1).await?;
                    if updated <= 0 {
                        // A concurrent decrease got there first; drop the line
                        self.kv.hdel(&key, product_id).await?;
                        0
                    } else {
                        updated as u64
                    }
                }
            }
        };

        self.refresh_expiry(&key).await;

        debug!(
            "Updated product {} quantity to {} for session {}",
            product_id, updated_quantity, session_id
        );

        let summary = self.summary(session_id).await?;
        Ok(CartUpdate {
            product_id: product_id.to_string(),
            updated_quantity,
            summary,
        })
    }

    /// Recompute totals from a fresh read of the whole record
    async fn summary(&self, session_id: &str) -> Result<CartSummary, StorageError> {
        let fields = self.kv.hgetall(&cart_key(session_id)).await?;

        if fields.is_empty() {
            return Ok(CartSummary::empty());
        }

        let mut items: Vec<CartItem> = fields
            .into_iter()
            .filter_map(|(product_id, quantity)| match quantity.parse::<i64>() {
                Ok(quantity) if quantity > 0 => Some(CartItem {
                    product_id,
                    quantity: quantity as u64,
                }),
                _ => {
                    warn!(
                        "Dropping cart field {} with invalid quantity {:?} for session {}",
                        product_id, quantity, session_id
                    );
                    None
                }
            })
            .collect();

        // Deterministic ordering: numeric ids numerically, the rest lexically
        items.sort_by(|a, b| {
            match (a.product_id.parse::<u64>(), b.product_id.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.product_id.cmp(&b.product_id),
            }
        });

        let total_quantity = items.iter().map(|item| item.quantity).sum();
        let items_count = items.len();

        Ok(CartSummary {
            items,
            total_quantity,
            items_count,
        })
    }

    /// Refresh the cart record's expiry when one is configured
    async fn refresh_expiry(&self, key: &str) {
        if let Some(ttl) = self.ttl {
            if let Err(e) = self.kv.expire(key, ttl).await {
                warn!("Cart expiry refresh for {} failed: {}", key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn store() -> CartStore {
        CartStore::new(Arc::new(InMemoryStore::new()), None)
    }

    #[tokio::test]
    async fn test_add_creates_and_increments() {
        let cart = store();

        let summary = cart.add("s1", "7").await.unwrap();
        assert_eq!(summary.total_quantity, 1);
        assert_eq!(summary.items_count, 1);

        let summary = cart.add("s1", "7").await.unwrap();
        assert_eq!(summary.total_quantity, 2);
        assert_eq!(summary.items_count, 1);

        let summary = cart.add("s1", "9").await.unwrap();
        assert_eq!(summary.total_quantity, 3);
        assert_eq!(summary.items_count, 2);
    }

    #[tokio::test]
    async fn test_get_empty_cart() {
        let cart = store();
        let summary = cart.get("nobody").await.unwrap();
        assert!(summary.items.is_empty());
        assert_eq!(summary.total_quantity, 0);
        assert_eq!(summary.items_count, 0);
    }

    #[tokio::test]
    async fn test_totals_equal_sum_of_items() {
        let cart = store();
        for _ in 0..3 {
            cart.add("s1", "1").await.unwrap();
        }
        for _ in 0..2 {
            cart.add("s1", "2").await.unwrap();
        }

        let summary = cart.get("s1").await.unwrap();
        let item_sum: u64 = summary.items.iter().map(|i| i.quantity).sum();
        assert_eq!(summary.total_quantity, item_sum);
        assert_eq!(summary.total_quantity, 5);
        assert!(summary.items.iter().all(|i| i.quantity >= 1));
    }

    #[tokio::test]
    async fn test_remove_drops_whole_line() {
        let cart = store();
        cart.add("s1", "7").await.unwrap();
        cart.add("s1", "7").await.unwrap();

        let (removed, summary) = cart.remove("s1", "7").await.unwrap();
        assert!(removed);
        assert_eq!(summary.total_quantity, 0);

        let (removed, _) = cart.remove("s1", "7").await.unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_update_increase() {
        let cart = store();
        cart.add("s1", "7").await.unwrap();

        let update = cart.update("s1", "7", CartAction::Increase).await.unwrap();
        assert_eq!(update.updated_quantity, 2);
        assert_eq!(update.summary.total_quantity, 2);
    }

    #[tokio::test]
    async fn test_decrease_to_zero_removes_field() {
        let cart = store();
        cart.add("s1", "7").await.unwrap();

        let update = cart.update("s1", "7", CartAction::Decrease).await.unwrap();
        assert_eq!(update.updated_quantity, 0);
        assert_eq!(update.summary.total_quantity, 0);
        assert!(update.summary.items.is_empty());

        // The line is gone, so another update reports NotInCart
        let err = cart.update("s1", "7", CartAction::Decrease).await.unwrap_err();
        assert!(matches!(err, CartError::NotInCart { .. }));
    }

    #[tokio::test]
    async fn test_decrease_above_one_decrements() {
        let cart = store();
        cart.add("s1", "7").await.unwrap();
        cart.add("s1", "7").await.unwrap();
        cart.add("s1", "7").await.unwrap();

        let update = cart.update("s1", "7", CartAction::Decrease).await.unwrap();
        assert_eq!(update.updated_quantity, 2);
        assert_eq!(update.summary.total_quantity, 2);
    }

    #[tokio::test]
    async fn test_update_absent_product_reports_actual_totals() {
        let cart = store();
        cart.add("s1", "1").await.unwrap();

        let err = cart.update("s1", "999", CartAction::Increase).await.unwrap_err();
        match err {
            CartError::NotInCart { product_id, summary } => {
                assert_eq!(product_id, "999");
                assert_eq!(summary.total_quantity, 1);
                assert_eq!(summary.items_count, 1);
            }
            other => panic!("expected NotInCart, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let cart = store();
        cart.add("s1", "1").await.unwrap();
        cart.add("s2", "2").await.unwrap();

        let s1 = cart.get("s1").await.unwrap();
        let s2 = cart.get("s2").await.unwrap();
        assert_eq!(s1.items[0].product_id, "1");
        assert_eq!(s2.items[0].product_id, "2");
    }

    #[tokio::test]
    async fn test_configured_ttl_is_applied_on_mutation() {
        let kv = Arc::new(InMemoryStore::new());
        let cart = CartStore::new(kv.clone(), Some(Duration::from_secs(3600)));

        cart.add("s1", "7").await.unwrap();
        assert!(kv.ttl_of("cart_items:s1").await.is_some());
    }

    #[tokio::test]
    async fn test_no_ttl_by_default() {
        let kv = Arc::new(InMemoryStore::new());
        let cart = CartStore::new(kv.clone(), None);

        cart.add("s1", "7").await.unwrap();
        assert!(kv.ttl_of("cart_items:s1").await.is_none());
    }
}
