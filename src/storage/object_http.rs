//! # HTTP Object Store
//!
//! Object store client for MinIO and other S3-compatible stores that serve
//! bucket contents over plain HTTP GET (`{endpoint}/{bucket}/{object}`).
//! A 404 is a clean "object does not exist"; any other failure is an
//! upstream error the caller must not confuse with absence.

use super::{ObjectStore, StorageError, StorageResult};
use crate::core::config::ObjectStoreConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

/// HTTP-based object store client
pub struct HttpObjectStore {
    /// Parsed base endpoint
    endpoint: Url,

    /// Shared HTTP client, built once at startup
    client: reqwest::Client,
}

impl HttpObjectStore {
    /// Build the client from configuration
    pub fn new(config: &ObjectStoreConfig) -> StorageResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| StorageError::object(format!("Invalid endpoint {}: {}", config.endpoint, e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StorageError::object(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    /// Build the full URL for an object
    fn object_url(&self, bucket: &str, object: &str) -> StorageResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::object(format!("Endpoint {} cannot carry a path", self.endpoint)))?
            .push(bucket)
            .push(object);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, bucket: &str, object: &str) -> StorageResult<Option<Vec<u8>>> {
        let url = self.object_url(bucket, object)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout
                } else {
                    StorageError::object(format!("GET {} failed: {}", url, e))
                }
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("Object {}/{} not found", bucket, object);
                Ok(None)
            }
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| StorageError::object(format!("Reading {} failed: {}", url, e)))?;
                debug!("Fetched object {}/{} ({} bytes)", bucket, object, body.len());
                Ok(Some(body.to_vec()))
            }
            status => Err(StorageError::object(format!(
                "GET {} returned {}",
                url, status
            ))),
        }
    }
}
