//! # Video URL Resolver
//!
//! Cache-aside lookup of embeddable video URLs by product id.
//!
//! Lookup order: per-product cache entry, bulk mapping table (itself cached),
//! per-product fallback file. Results are always written back, including
//! negative ones, so a product without a video costs one object-store round
//! trip per TTL window instead of one per request. A confirmed absence is
//! cached as long as a real URL; an absence produced by upstream failures is
//! cached briefly so the next window retries.

use super::normalize::normalize_video_url;
use super::ResolveError;
use crate::core::config::{ServiceConfig, TtlConfig};
use crate::storage::{KeyValueStore, ObjectStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key prefix for per-product resolved URLs
const VIDEO_URL_KEY_PREFIX: &str = "video_url_";

/// Key holding the cached bulk mapping table
const MAPPINGS_KEY: &str = "videos_json_mappings";

/// Key holding the cached product list
const PRODUCT_LIST_KEY: &str = "product_list_with_videos";

/// Bulk mapping document name in the object store
const MAPPINGS_OBJECT: &str = "videos.json";

/// Stored marker for "confirmed no video"
const NULL_SENTINEL: &str = "null";

/// Cache key for one product's resolved URL
fn video_url_key(product_id: &str) -> String {
    format!("{}{}", VIDEO_URL_KEY_PREFIX, product_id)
}

/// Per-product fallback object name
fn product_object(product_id: &str) -> String {
    format!("product{}.txt", product_id)
}

/// Where a resolution ultimately came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoSource {
    Cache,
    BulkTable,
    SingleFile,
    NotFound,
}

/// Outcome of a single resolve call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// The product the lookup was for
    pub product_id: String,

    /// Normalized embed URL, or `None` for a product without a video
    pub video_url: Option<String>,

    /// Whether the answer came straight from the per-product cache entry
    pub cached: bool,

    /// Where the answer was found
    pub source: VideoSource,
}

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Object store bucket holding video documents
    pub bucket: String,

    /// TTL policy
    pub ttl: TtlConfig,

    /// Bounded parallelism for batch resolution
    pub batch_concurrency: usize,
}

impl ResolverConfig {
    /// Extract the resolver's slice of the service configuration
    pub fn from_service(config: &ServiceConfig) -> Self {
        Self {
            bucket: config.object_store.bucket.clone(),
            ttl: config.ttl.clone(),
            batch_concurrency: config.batch.concurrency,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            bucket: "videos".to_string(),
            ttl: TtlConfig::default(),
            batch_concurrency: 8,
        }
    }
}

/// Outcome of consulting one lookup path
enum Lookup {
    /// A raw (not yet normalized) URL reference
    Found(String),
    /// The path answered and the product has nothing
    Absent,
    /// The path could not answer
    Failed,
}

/// Outcome of acquiring the bulk mapping table
enum Mappings {
    Table(HashMap<String, Value>),
    /// No bulk document exists in the bucket
    Missing,
    /// Fetch or parse failed
    Failed,
}

/// Cache-aside video URL resolver
pub struct VideoResolver {
    /// Key-value store holding cache entries
    kv: Arc<dyn KeyValueStore>,

    /// Object store holding mapping documents
    objects: Arc<dyn ObjectStore>,

    /// Configuration
    config: ResolverConfig,
}

impl VideoResolver {
    /// Create a resolver over injected store clients
    pub fn new(kv: Arc<dyn KeyValueStore>, objects: Arc<dyn ObjectStore>, config: ResolverConfig) -> Self {
        Self { kv, objects, config }
    }

    /// TTL applied to cached product lists, for callers that echo it
    pub fn product_list_ttl_secs(&self) -> u64 {
        self.config.ttl.product_list.as_secs()
    }

    /// Resolve the embeddable video URL for a product
    ///
    /// Returns `Err` only when no lookup path could answer; in that case a
    /// short-lived negative entry has already been written (best effort) so
    /// repeated failing lookups stay cheap.
    pub async fn resolve(&self, product_id: &str) -> Result<Resolution, ResolveError> {
        let cache_key = video_url_key(product_id);

        let mut cache_read_failed = false;
        match self.kv.get(&cache_key).await {
            Ok(Some(cached)) => {
                debug!("Video URL cache hit for product {}", product_id);
                let video_url = if cached == NULL_SENTINEL { None } else { Some(cached) };
                return Ok(Resolution {
                    product_id: product_id.to_string(),
                    video_url,
                    cached: true,
                    source: VideoSource::Cache,
                });
            }
            Ok(None) => {
                debug!("Video URL cache miss for product {}", product_id);
            }
            Err(e) => {
                warn!("Video URL cache read failed for product {}: {}", product_id, e);
                cache_read_failed = true;
            }
        }

        // Bulk mapping table first
        let bulk = self.lookup_bulk(product_id).await;
        let bulk_failed = matches!(bulk, Lookup::Failed);

        let mut video_url = None;
        let mut source = VideoSource::NotFound;

        if let Lookup::Found(raw) = &bulk {
            if let Some(url) = normalize_video_url(raw) {
                video_url = Some(url);
                source = VideoSource::BulkTable;
            } else {
                debug!("Bulk table URL for product {} did not normalize: {}", product_id, raw);
            }
        }

        // Per-product fallback file when the table had nothing usable
        let mut file_failed = false;
        if video_url.is_none() {
            match self.lookup_fallback_file(product_id).await {
                Lookup::Found(raw) => {
                    if let Some(url) = normalize_video_url(&raw) {
                        video_url = Some(url);
                        source = VideoSource::SingleFile;
                    }
                }
                Lookup::Absent => {}
                Lookup::Failed => file_failed = true,
            }
        }

        // Write-back: positive and confirmed-negative results live long,
        // failure-tainted negatives live short so the next window retries.
        let tainted = cache_read_failed || bulk_failed || file_failed;
        let ttl = if video_url.is_some() || !tainted {
            self.config.ttl.video_url
        } else {
            self.config.ttl.video_error
        };

        let cache_value = video_url.as_deref().unwrap_or(NULL_SENTINEL);
        if let Err(e) = self.kv.set_ex(&cache_key, cache_value, ttl).await {
            warn!("Cache write for product {} failed: {}", product_id, e);
        } else {
            debug!(
                "Video URL cached for product {}: {}",
                product_id,
                if video_url.is_some() { "found" } else { "not found" }
            );
        }

        // Both object-store paths failing means absence was never confirmed
        if video_url.is_none() && bulk_failed && file_failed {
            return Err(ResolveError::LookupFailed {
                product_id: product_id.to_string(),
            });
        }

        Ok(Resolution {
            product_id: product_id.to_string(),
            video_url,
            cached: false,
            source,
        })
    }

    /// Resolve many products with bounded parallelism
    ///
    /// Elements are independent: one failed resolution yields `None` for
    /// that product and never affects the rest of the batch.
    pub async fn resolve_batch(&self, product_ids: Vec<String>) -> HashMap<String, Option<String>> {
        stream::iter(product_ids)
            .map(|product_id| async move {
                let video_url = match self.resolve(&product_id).await {
                    Ok(resolution) => resolution.video_url,
                    Err(e) => {
                        warn!("Batch resolution failed for product {}: {}", product_id, e);
                        None
                    }
                };
                (product_id, video_url)
            })
            .buffer_unordered(self.config.batch_concurrency)
            .collect()
            .await
    }

    /// Cache an opaque product list
    pub async fn store_product_list(&self, products: &[Value]) -> Result<(), crate::storage::StorageError> {
        let payload = serde_json::to_string(products)?;
        self.kv
            .set_ex(PRODUCT_LIST_KEY, &payload, self.config.ttl.product_list)
            .await?;
        info!("Product list cached for {:?}", self.config.ttl.product_list);
        Ok(())
    }

    /// Fetch the cached product list, if a live copy exists
    pub async fn cached_product_list(&self) -> Result<Option<Value>, crate::storage::StorageError> {
        match self.kv.get(PRODUCT_LIST_KEY).await? {
            Some(raw) => {
                debug!("Product list cache hit");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    /// Invalidate video caches
    ///
    /// With a product id, only that product's entry is dropped. Without
    /// one, every per-product entry is found by prefix scan and deleted
    /// along with the mapping table and product list.
    pub async fn invalidate(&self, product_id: Option<&str>) -> Result<usize, crate::storage::StorageError> {
        match product_id {
            Some(id) => {
                let deleted = self.kv.delete(&[video_url_key(id)]).await?;
                info!("Cleared video cache for product {}", id);
                Ok(deleted)
            }
            None => {
                let mut keys = self.kv.keys(&format!("{}*", VIDEO_URL_KEY_PREFIX)).await?;
                keys.push(MAPPINGS_KEY.to_string());
                keys.push(PRODUCT_LIST_KEY.to_string());
                let deleted = self.kv.delete(&keys).await?;
                info!("Cleared all video caches ({} keys)", deleted);
                Ok(deleted)
            }
        }
    }

    /// Look a product up in the bulk mapping table
    async fn lookup_bulk(&self, product_id: &str) -> Lookup {
        let table = match self.load_mappings().await {
            Mappings::Table(table) => table,
            Mappings::Missing => return Lookup::Absent,
            Mappings::Failed => return Lookup::Failed,
        };

        let entry = match table.get(product_id) {
            Some(Value::Object(entry)) => entry,
            _ => return Lookup::Absent,
        };

        match entry.get("video_url").and_then(Value::as_str) {
            Some(raw) if !raw.is_empty() => {
                let name = entry.get("name").and_then(Value::as_str).unwrap_or("unnamed");
                debug!("Found video for product {} ({}): {}", product_id, name, raw);
                Lookup::Found(raw.to_string())
            }
            _ => {
                debug!("Product {} has no video URL in the bulk table", product_id);
                Lookup::Absent
            }
        }
    }

    /// Acquire the bulk mapping table, preferring the cached copy
    async fn load_mappings(&self) -> Mappings {
        match self.kv.get(MAPPINGS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(table) => {
                    debug!("Video mappings cache hit");
                    return Mappings::Table(table);
                }
                Err(e) => {
                    warn!("Cached video mappings failed to parse, refetching: {}", e);
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Video mappings cache read failed: {}", e);
            }
        }

        debug!("Loading {} from object store", MAPPINGS_OBJECT);
        let body = match self.objects.get(&self.config.bucket, MAPPINGS_OBJECT).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!("No {} in bucket {}", MAPPINGS_OBJECT, self.config.bucket);
                return Mappings::Missing;
            }
            Err(e) => {
                warn!("Fetching {} failed: {}", MAPPINGS_OBJECT, e);
                return Mappings::Failed;
            }
        };

        let raw = match String::from_utf8(body) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{} is not valid UTF-8: {}", MAPPINGS_OBJECT, e);
                return Mappings::Failed;
            }
        };

        let table: HashMap<String, Value> = match serde_json::from_str(&raw) {
            Ok(table) => table,
            Err(e) => {
                warn!("{} failed to parse: {}", MAPPINGS_OBJECT, e);
                return Mappings::Failed;
            }
        };

        if let Err(e) = self.kv.set_ex(MAPPINGS_KEY, &raw, self.config.ttl.mappings).await {
            warn!("Caching video mappings failed: {}", e);
        } else {
            debug!("Video mappings cached for {:?}", self.config.ttl.mappings);
        }

        Mappings::Table(table)
    }

    /// Fetch the per-product fallback file
    async fn lookup_fallback_file(&self, product_id: &str) -> Lookup {
        let object = product_object(product_id);

        match self.objects.get(&self.config.bucket, &object).await {
            Ok(Some(body)) => match String::from_utf8(body) {
                Ok(content) => {
                    let raw = content.trim().to_string();
                    if raw.is_empty() {
                        Lookup::Absent
                    } else {
                        Lookup::Found(raw)
                    }
                }
                Err(e) => {
                    warn!("Fallback file {} is not valid UTF-8: {}", object, e);
                    Lookup::Failed
                }
            },
            Ok(None) => {
                debug!("No individual video file for product {}", product_id);
                Lookup::Absent
            }
            Err(e) => {
                warn!("Fetching fallback file {} failed: {}", object, e);
                Lookup::Failed
            }
        }
    }
}
