//! # Shop Cache Service Library
//!
//! Cache and cart backend for the webshop storefront. The service fronts
//! two external stores: a Redis key-value store holding cache entries and
//! session cart records, and an S3-compatible object store holding video
//! mapping documents.
//!
//! ## Architecture
//! - `core`: error types and configuration
//! - `storage`: key-value and object store traits plus the Redis, HTTP,
//!   and in-memory implementations
//! - `video`: URL normalization and the cache-aside video URL resolver
//! - `cart`: session cart store over grouped key-value records
//! - `api`: the axum HTTP facade

/// Core functionality: error types and configuration
pub mod core;

/// Storage traits and implementations
pub mod storage;

/// Video URL normalization and cache-aside resolution
pub mod video;

/// Session cart store
pub mod cart;

/// HTTP facade
pub mod api;

/// Main error and result types, re-exported for convenience
pub use crate::core::error::{ServiceError, ServiceResult};

/// Service configuration, re-exported because every embedder needs it
pub use crate::core::config::ServiceConfig;

/// Primary components, the public API surface of this crate
pub use crate::cart::CartStore;
pub use crate::video::VideoResolver;
