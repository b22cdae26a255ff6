//! # Resolver Integration Tests
//!
//! Cache-aside semantics of the video URL resolver against in-memory
//! stores: lookup order, sentinel handling, TTL asymmetry between
//! confirmed absence and upstream failure, and batch independence.

use async_trait::async_trait;
use serde_json::json;
use shop_cache::core::config::TtlConfig;
use shop_cache::storage::{
    InMemoryObjectStore, InMemoryStore, KeyValueStore, ObjectStore, StorageError, StorageResult,
};
use shop_cache::video::{ResolverConfig, VideoResolver, VideoSource};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const EMBED_ABC: &str =
    "https://www.youtube-nocookie.com/embed/abc123?rel=0&modestbranding=1&showinfo=0";

/// Object store double that counts accesses
struct CountingObjectStore {
    inner: InMemoryObjectStore,
    accesses: AtomicUsize,
}

impl CountingObjectStore {
    fn new(inner: InMemoryObjectStore) -> Self {
        Self {
            inner,
            accesses: AtomicUsize::new(0),
        }
    }

    fn access_count(&self) -> usize {
        self.accesses.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ObjectStore for CountingObjectStore {
    async fn get(&self, bucket: &str, object: &str) -> StorageResult<Option<Vec<u8>>> {
        self.accesses.fetch_add(1, Ordering::Relaxed);
        self.inner.get(bucket, object).await
    }
}

/// Object store double that fails for selected objects (all, by default)
struct FailingObjectStore {
    inner: InMemoryObjectStore,
    fail_objects: Option<HashSet<String>>,
}

impl FailingObjectStore {
    fn fail_all() -> Self {
        Self {
            inner: InMemoryObjectStore::new(),
            fail_objects: None,
        }
    }

    fn fail_only(inner: InMemoryObjectStore, objects: &[&str]) -> Self {
        Self {
            inner,
            fail_objects: Some(objects.iter().map(|o| o.to_string()).collect()),
        }
    }
}

#[async_trait]
impl ObjectStore for FailingObjectStore {
    async fn get(&self, bucket: &str, object: &str) -> StorageResult<Option<Vec<u8>>> {
        let fails = match &self.fail_objects {
            None => true,
            Some(objects) => objects.contains(object),
        };

        if fails {
            Err(StorageError::object("object store unavailable"))
        } else {
            self.inner.get(bucket, object).await
        }
    }
}

fn resolver_over(
    kv: Arc<InMemoryStore>,
    objects: Arc<dyn ObjectStore>,
) -> VideoResolver {
    VideoResolver::new(kv, objects, ResolverConfig::default())
}

async fn seeded_object_store() -> InMemoryObjectStore {
    let objects = InMemoryObjectStore::new();
    let mappings = json!({
        "1": { "id": 1, "name": "Roof Box", "video_url": "https://youtu.be/abc123" },
        "2": { "id": 2, "name": "Ski Rack", "video_url": "" },
        "3": { "id": 3, "name": "Snow Chains", "video_url": "https://vimeo.com/99" },
    });
    objects
        .put("videos", "videos.json", mappings.to_string().into_bytes())
        .await;
    objects
}

#[tokio::test]
async fn test_resolves_from_bulk_table() {
    let kv = Arc::new(InMemoryStore::new());
    let resolver = resolver_over(kv.clone(), Arc::new(seeded_object_store().await));

    let resolution = resolver.resolve("1").await.unwrap();
    assert_eq!(resolution.video_url.as_deref(), Some(EMBED_ABC));
    assert_eq!(resolution.source, VideoSource::BulkTable);
    assert!(!resolution.cached);

    // The mapping table was written back with its own TTL
    assert!(kv.get("videos_json_mappings").await.unwrap().is_some());
    let ttl = kv.ttl_of("videos_json_mappings").await.unwrap();
    assert!(ttl <= Duration::from_secs(600));
}

#[tokio::test]
async fn test_repeat_resolution_is_cache_hit_without_object_store_access() {
    let kv = Arc::new(InMemoryStore::new());
    let counting = Arc::new(CountingObjectStore::new(seeded_object_store().await));
    let resolver = resolver_over(kv.clone(), counting.clone());

    let first = resolver.resolve("1").await.unwrap();
    let accesses_after_first = counting.access_count();
    assert!(accesses_after_first >= 1);

    let second = resolver.resolve("1").await.unwrap();
    assert_eq!(second.video_url, first.video_url);
    assert!(second.cached);
    assert_eq!(second.source, VideoSource::Cache);
    assert_eq!(counting.access_count(), accesses_after_first);
}

#[tokio::test]
async fn test_falls_back_to_single_file() {
    let kv = Arc::new(InMemoryStore::new());
    let objects = seeded_object_store().await;
    objects
        .put("videos", "product7.txt", b"  https://youtube.com/watch?v=xyz_42  \n".to_vec())
        .await;
    let resolver = resolver_over(kv, Arc::new(objects));

    let resolution = resolver.resolve("7").await.unwrap();
    assert_eq!(
        resolution.video_url.as_deref(),
        Some("https://www.youtube-nocookie.com/embed/xyz_42?rel=0&modestbranding=1&showinfo=0")
    );
    assert_eq!(resolution.source, VideoSource::SingleFile);
}

#[tokio::test]
async fn test_unusable_bulk_url_falls_back_to_file() {
    let kv = Arc::new(InMemoryStore::new());
    let objects = seeded_object_store().await;
    // Product 3 has a vimeo URL in the bulk table, which never normalizes
    objects
        .put("videos", "product3.txt", b"https://youtu.be/backup1".to_vec())
        .await;
    let resolver = resolver_over(kv, Arc::new(objects));

    let resolution = resolver.resolve("3").await.unwrap();
    assert_eq!(resolution.source, VideoSource::SingleFile);
    assert!(resolution.video_url.unwrap().contains("backup1"));
}

#[tokio::test]
async fn test_confirmed_absence_is_cached_long() {
    let kv = Arc::new(InMemoryStore::new());
    let resolver = resolver_over(kv.clone(), Arc::new(seeded_object_store().await));

    // Product 2 is in the table with an empty URL and has no fallback file
    let resolution = resolver.resolve("2").await.unwrap();
    assert_eq!(resolution.video_url, None);
    assert_eq!(resolution.source, VideoSource::NotFound);

    // Stored as the sentinel, with the long TTL (absence is stable)
    assert_eq!(kv.get("video_url_2").await.unwrap().as_deref(), Some("null"));
    let ttl = kv.ttl_of("video_url_2").await.unwrap();
    assert!(ttl > Duration::from_secs(1800));
    assert!(ttl <= Duration::from_secs(21_600));

    // The repeat lookup is a cache hit decoding the sentinel back to None
    let second = resolver.resolve("2").await.unwrap();
    assert!(second.cached);
    assert_eq!(second.video_url, None);
    assert_eq!(second.source, VideoSource::Cache);
}

#[tokio::test]
async fn test_total_upstream_failure_errors_and_caches_short() {
    let kv = Arc::new(InMemoryStore::new());
    let resolver = resolver_over(kv.clone(), Arc::new(FailingObjectStore::fail_all()));

    let result = resolver.resolve("5").await;
    assert!(result.is_err());

    // The negative result was still written, but with the short error TTL
    assert_eq!(kv.get("video_url_5").await.unwrap().as_deref(), Some("null"));
    let ttl = kv.ttl_of("video_url_5").await.unwrap();
    assert!(ttl <= Duration::from_secs(1800));
}

#[tokio::test]
async fn test_bulk_failure_with_clean_file_answer_degrades() {
    let kv = Arc::new(InMemoryStore::new());

    // videos.json fetch fails, but per-product files still answer
    let inner = InMemoryObjectStore::new();
    inner
        .put("videos", "product8.txt", b"https://youtu.be/fine".to_vec())
        .await;
    let objects = FailingObjectStore::fail_only(inner, &["videos.json"]);
    let resolver = resolver_over(kv.clone(), Arc::new(objects));

    // A usable fallback file still resolves, cached with the long TTL
    let resolution = resolver.resolve("8").await.unwrap();
    assert_eq!(resolution.source, VideoSource::SingleFile);
    assert!(kv.ttl_of("video_url_8").await.unwrap() > Duration::from_secs(1800));

    // A missing fallback file yields a clean None, but the absence is
    // failure-tainted so it only lives for the short TTL
    let resolution = resolver.resolve("9").await.unwrap();
    assert_eq!(resolution.video_url, None);
    assert_eq!(resolution.source, VideoSource::NotFound);
    assert!(kv.ttl_of("video_url_9").await.unwrap() <= Duration::from_secs(1800));
}

#[tokio::test]
async fn test_preseeded_sentinel_decodes_to_none() {
    let kv = Arc::new(InMemoryStore::new());
    kv.set_ex("video_url_4", "null", Duration::from_secs(60)).await.unwrap();
    let resolver = resolver_over(kv, Arc::new(seeded_object_store().await));

    let resolution = resolver.resolve("4").await.unwrap();
    assert!(resolution.cached);
    assert_eq!(resolution.video_url, None);
    assert_eq!(resolution.source, VideoSource::Cache);
}

#[tokio::test]
async fn test_batch_mixed_results_never_fail() {
    let kv = Arc::new(InMemoryStore::new());
    let resolver = resolver_over(kv, Arc::new(seeded_object_store().await));

    let results = resolver
        .resolve_batch(vec!["1".to_string(), "404".to_string()])
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results.get("1").unwrap().as_deref(), Some(EMBED_ABC));
    assert_eq!(results.get("404").unwrap(), &None);
}

#[tokio::test]
async fn test_batch_survives_total_store_failure() {
    let kv = Arc::new(InMemoryStore::new());
    let resolver = resolver_over(kv, Arc::new(FailingObjectStore::fail_all()));

    let results = resolver
        .resolve_batch(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        .await;

    assert_eq!(results.len(), 3);
    assert!(results.values().all(|url| url.is_none()));
}

#[tokio::test]
async fn test_invalidate_single_product() {
    let kv = Arc::new(InMemoryStore::new());
    let resolver = resolver_over(kv.clone(), Arc::new(seeded_object_store().await));

    resolver.resolve("1").await.unwrap();
    assert!(kv.get("video_url_1").await.unwrap().is_some());

    resolver.invalidate(Some("1")).await.unwrap();
    assert!(kv.get("video_url_1").await.unwrap().is_none());
    // The bulk table stays; only the product entry was dropped
    assert!(kv.get("videos_json_mappings").await.unwrap().is_some());
}

#[tokio::test]
async fn test_invalidate_all_clears_every_video_key() {
    let kv = Arc::new(InMemoryStore::new());
    let resolver = resolver_over(kv.clone(), Arc::new(seeded_object_store().await));

    resolver.resolve("1").await.unwrap();
    resolver.resolve("2").await.unwrap();
    resolver
        .store_product_list(&[json!({"id": 1, "name": "Roof Box"})])
        .await
        .unwrap();

    resolver.invalidate(None).await.unwrap();

    assert!(kv.get("video_url_1").await.unwrap().is_none());
    assert!(kv.get("video_url_2").await.unwrap().is_none());
    assert!(kv.get("videos_json_mappings").await.unwrap().is_none());
    assert!(kv.get("product_list_with_videos").await.unwrap().is_none());
}

#[tokio::test]
async fn test_product_list_round_trip() {
    let kv = Arc::new(InMemoryStore::new());
    let resolver = resolver_over(kv.clone(), Arc::new(InMemoryObjectStore::new()));

    assert!(resolver.cached_product_list().await.unwrap().is_none());

    let products = vec![json!({"id": 1}), json!({"id": 2})];
    resolver.store_product_list(&products).await.unwrap();

    let cached = resolver.cached_product_list().await.unwrap().unwrap();
    assert_eq!(cached, json!([{"id": 1}, {"id": 2}]));

    let ttl = kv.ttl_of("product_list_with_videos").await.unwrap();
    assert!(ttl <= Duration::from_secs(600));
}

#[tokio::test]
async fn test_custom_ttl_configuration_is_honored() {
    let kv = Arc::new(InMemoryStore::new());
    let config = ResolverConfig {
        ttl: TtlConfig {
            video_url: Duration::from_secs(60),
            video_error: Duration::from_secs(5),
            mappings: Duration::from_secs(30),
            product_list: Duration::from_secs(30),
        },
        ..ResolverConfig::default()
    };
    let resolver = VideoResolver::new(kv.clone(), Arc::new(seeded_object_store().await), config);

    resolver.resolve("1").await.unwrap();
    assert!(kv.ttl_of("video_url_1").await.unwrap() <= Duration::from_secs(60));
    assert!(kv.ttl_of("videos_json_mappings").await.unwrap() <= Duration::from_secs(30));
}
