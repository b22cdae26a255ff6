//! # HTTP Object Store Tests
//!
//! The HTTP object store against a mock S3-style server: clean fetches,
//! the 404-is-absence contract, and upstream failures.

use shop_cache::core::config::ObjectStoreConfig;
use shop_cache::storage::{HttpObjectStore, ObjectStore, StorageError};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(server: &MockServer) -> HttpObjectStore {
    let config = ObjectStoreConfig {
        endpoint: server.uri(),
        bucket: "videos".to_string(),
        request_timeout: Duration::from_secs(2),
    };
    HttpObjectStore::new(&config).unwrap()
}

#[tokio::test]
async fn test_fetches_object_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/videos.json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(br#"{"1":{"id":1}}"#.to_vec()))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let body = store.get("videos", "videos.json").await.unwrap();
    assert_eq!(body, Some(br#"{"1":{"id":1}}"#.to_vec()));
}

#[tokio::test]
async fn test_missing_object_is_none_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/product9.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let body = store.get("videos", "product9.txt").await.unwrap();
    assert_eq!(body, None);
}

#[tokio::test]
async fn test_server_error_is_an_error_not_absence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/videos.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let result = store.get("videos", "videos.json").await;
    assert!(matches!(result, Err(StorageError::Object { .. })));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/videos.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"{}".to_vec())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = ObjectStoreConfig {
        endpoint: server.uri(),
        bucket: "videos".to_string(),
        request_timeout: Duration::from_millis(100),
    };
    let store = HttpObjectStore::new(&config).unwrap();

    let result = store.get("videos", "videos.json").await;
    assert!(matches!(result, Err(StorageError::Timeout)));
}
