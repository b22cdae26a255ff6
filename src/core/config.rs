//! # Configuration Module
//!
//! Configuration for the shop cache service: server binding, Redis and
//! object-store connectivity, and the TTL policy for every cached artifact.
//!
//! ## Key Features
//! - YAML configuration parsing with serde
//! - Environment variable overrides matching the deployment surface
//!   (`CACHE_PORT`, `REDIS_HOST`, `REDIS_PORT`, `REDIS_URL`, `MINIO_ENDPOINT`)
//! - Validation with detailed error messages
//! - Sensible defaults so the service runs without a config file

use crate::core::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Main service configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Redis key-value store configuration
    pub redis: RedisConfig,

    /// Object store (MinIO / S3-compatible) configuration
    pub object_store: ObjectStoreConfig,

    /// TTL policy for cached entries
    pub ttl: TtlConfig,

    /// Cart record configuration
    pub cart: CartConfig,

    /// Batch resolution configuration
    pub batch: BatchConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    pub bind_address: String,

    /// HTTP port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

/// Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection establishment timeout
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,

    /// Timeout applied to every individual Redis operation
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Maximum number of retries for a failed operation
    pub max_retries: u32,

    /// Delay between retries (scaled by attempt number)
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Optional prefix applied to every key. Empty by default so stored
    /// keys match the documented wire schema exactly.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(1),
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            key_prefix: String::new(),
        }
    }
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Base endpoint of the S3-compatible store, e.g. `http://minio:9000`
    pub endpoint: String,

    /// Bucket holding video mapping documents
    pub bucket: String,

    /// Timeout applied to every object fetch
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".to_string(),
            bucket: "videos".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// TTL policy for cached entries
///
/// A resolved (or confirmed-absent) video URL is stable and cached long;
/// a resolution that failed on an upstream error is transient and cached
/// short so the next window retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// TTL for resolved video URLs, including the confirmed-absent sentinel
    #[serde(with = "humantime_serde")]
    pub video_url: Duration,

    /// TTL for the sentinel written after an upstream failure
    #[serde(with = "humantime_serde")]
    pub video_error: Duration,

    /// TTL for the cached bulk mapping table
    #[serde(with = "humantime_serde")]
    pub mappings: Duration,

    /// TTL for the cached product list
    #[serde(with = "humantime_serde")]
    pub product_list: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            video_url: Duration::from_secs(21_600),
            video_error: Duration::from_secs(1_800),
            mappings: Duration::from_secs(600),
            product_list: Duration::from_secs(600),
        }
    }
}

/// Cart record configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CartConfig {
    /// Optional expiry applied to cart records on every mutation.
    /// Absent by default: carts persist until explicitly cleared.
    #[serde(default, with = "humantime_serde::option")]
    pub ttl: Option<Duration>,
}

/// Batch resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of products resolved concurrently in one batch call
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

impl ServiceConfig {
    /// Load configuration from a YAML file, falling back to defaults when
    /// the file does not exist, then apply environment overrides.
    pub async fn load<P: AsRef<Path>>(path: P) -> ServiceResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                ServiceError::config(format!("Failed to read config file {}: {}", path.display(), e))
            })?;

            serde_yaml::from_str(&content).map_err(|e| {
                ServiceError::config(format!("Failed to parse config {}: {}", path.display(), e))
            })?
        } else {
            info!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// These mirror the variables the deployment already sets for the
    /// service, so a container needs no config file at all.
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = env::var("CACHE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(url) = env::var("REDIS_URL") {
            self.redis.url = url;
        } else if let Ok(host) = env::var("REDIS_HOST") {
            let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
            self.redis.url = format!("redis://{}:{}", host, port);
        }

        if let Ok(endpoint) = env::var("MINIO_ENDPOINT") {
            self.object_store.endpoint = endpoint;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ServiceResult<()> {
        if self.server.port == 0 {
            return Err(ServiceError::config("Server port must be non-zero"));
        }

        if self.redis.url.is_empty() {
            return Err(ServiceError::config("Redis URL must not be empty"));
        }

        Url::parse(&self.object_store.endpoint).map_err(|e| {
            ServiceError::config(format!(
                "Invalid object store endpoint {}: {}",
                self.object_store.endpoint, e
            ))
        })?;

        if self.object_store.bucket.is_empty() {
            return Err(ServiceError::config("Object store bucket must not be empty"));
        }

        for (name, ttl) in [
            ("ttl.video_url", self.ttl.video_url),
            ("ttl.video_error", self.ttl.video_error),
            ("ttl.mappings", self.ttl.mappings),
            ("ttl.product_list", self.ttl.product_list),
        ] {
            if ttl.is_zero() {
                return Err(ServiceError::config(format!("{} must be greater than zero", name)));
            }
        }

        if self.batch.concurrency == 0 {
            return Err(ServiceError::config("batch.concurrency must be greater than zero"));
        }

        Ok(())
    }

    /// Full socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
