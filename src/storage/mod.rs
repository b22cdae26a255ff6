//! # Storage Module
//!
//! Storage abstractions for the two external stores the service talks to:
//! the key-value store holding cache entries and cart records, and the
//! object store holding video mapping documents.
//!
//! Both stores are behind object-safe traits so the resolver and cart store
//! receive explicitly constructed, injected clients and tests can substitute
//! in-memory implementations.

pub mod memory;
pub mod object_http;
pub mod redis_store;

pub use memory::{InMemoryObjectStore, InMemoryStore};
pub use object_http::HttpObjectStore;
pub use redis_store::RedisStore;

use crate::core::error::ServiceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Storage operation result
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-specific error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Storage operation timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Object store error: {message}")]
    Object { message: String },

    #[error("Storage not available")]
    Unavailable,
}

impl StorageError {
    /// Create an object store error with a custom message
    pub fn object<S: Into<String>>(message: S) -> Self {
        Self::Object {
            message: message.into(),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage {
            message: err.to_string(),
        }
    }
}

/// Trait for key-value store implementations
///
/// Covers the plain-string entries used by the cache-aside paths and the
/// hash (grouped record) entries used by cart records. Each method is a
/// single store round trip; callers compose them without any cross-call
/// transaction.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a string value; `None` when the key is absent or expired
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Set a string value with no expiry
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Set a string value that expires after `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()>;

    /// Delete the given keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> StorageResult<usize>;

    /// List keys matching a glob pattern (SCAN-based, never blocking KEYS)
    async fn keys(&self, pattern: &str) -> StorageResult<Vec<String>>;

    /// Get a single field from a hash entry
    async fn hget(&self, key: &str, field: &str) -> StorageResult<Option<String>>;

    /// Set a single field on a hash entry
    async fn hset(&self, key: &str, field: &str, value: &str) -> StorageResult<()>;

    /// Atomically add `delta` to an integer hash field, returning the new value
    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StorageResult<i64>;

    /// Delete a field from a hash entry, returning whether it existed
    async fn hdel(&self, key: &str, field: &str) -> StorageResult<bool>;

    /// Read all fields of a hash entry; empty map when the key is absent
    async fn hgetall(&self, key: &str) -> StorageResult<HashMap<String, String>>;

    /// Set an expiry on an existing key, returning whether the key existed
    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool>;

    /// Connectivity check
    async fn ping(&self) -> StorageResult<()>;
}

/// Trait for object store implementations
///
/// `Ok(None)` means the object does not exist (a clean miss); `Err` means
/// the store could not answer. The resolver treats the two very differently
/// when deciding cache TTLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the raw bytes of an object
    async fn get(&self, bucket: &str, object: &str) -> StorageResult<Option<Vec<u8>>>;
}
