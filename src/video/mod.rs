//! # Video Module
//!
//! Cache-aside resolution of product video URLs. The resolver consults the
//! key-value store first, then the bulk mapping document in the object
//! store, then a per-product fallback file, and writes whatever it learned
//! back with a TTL chosen by how trustworthy the answer is.

pub mod normalize;
pub mod resolver;

pub use normalize::normalize_video_url;
pub use resolver::{Resolution, ResolverConfig, VideoResolver, VideoSource};

use crate::core::error::ServiceError;

/// Resolver error: the pipeline could not produce an authoritative answer
///
/// Raised only when every lookup path failed. A clean "no video for this
/// product" is a successful resolution carrying `None`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("video URL lookup failed for product {product_id}")]
    LookupFailed { product_id: String },
}

impl From<ResolveError> for ServiceError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::LookupFailed { product_id } => ServiceError::Resolve { product_id },
        }
    }
}
