//! # Redis Key-Value Store
//!
//! Redis-backed implementation of [`KeyValueStore`] using a shared
//! `ConnectionManager`. Every operation is bounded by the configured
//! per-operation timeout and retried with reconnection on failure, so a
//! slow or flapping Redis degrades a request instead of hanging it.

use super::{KeyValueStore, StorageError, StorageResult};
use crate::core::config::RedisConfig;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Redis key-value store
pub struct RedisStore {
    /// Configuration
    config: RedisConfig,

    /// Shared connection manager, initialized once at startup
    connection_manager: Arc<RwLock<ConnectionManager>>,
}

impl RedisStore {
    /// Connect to Redis and build the shared connection manager
    pub async fn connect(config: RedisConfig) -> StorageResult<Self> {
        let client = Client::open(config.url.as_str())?;

        let connection_manager = timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StorageError::Timeout)??;

        info!("Redis store connected to {}", config.url);

        Ok(Self {
            config,
            connection_manager: Arc::new(RwLock::new(connection_manager)),
        })
    }

    /// Get the full key with the configured prefix
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// Execute a Redis operation with a per-attempt timeout and retry logic
    async fn execute_with_retry<F, T>(&self, operation: F) -> StorageResult<T>
    where
        F: Fn(&mut ConnectionManager) -> std::pin::Pin<Box<dyn std::future::Future<Output = RedisResult<T>> + Send + '_>> + Send + Sync,
        T: Send,
    {
        let mut retries = 0;

        loop {
            let mut conn = self.connection_manager.write().await;

            let attempt = timeout(self.config.operation_timeout, operation(&mut *conn)).await;

            let err = match attempt {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    warn!("Redis operation failed: {}", e);
                    StorageError::Redis(e)
                }
                Err(_) => {
                    warn!("Redis operation timed out after {:?}", self.config.operation_timeout);
                    StorageError::Timeout
                }
            };

            if retries >= self.config.max_retries {
                return Err(err);
            }

            retries += 1;
            drop(conn); // Release the lock before sleeping

            tokio::time::sleep(self.config.retry_delay * retries).await;

            if let Err(reconnect_err) = self.reconnect().await {
                warn!("Failed to reconnect to Redis: {}", reconnect_err);
            }
        }
    }

    /// Rebuild the connection manager
    async fn reconnect(&self) -> StorageResult<()> {
        let client = Client::open(self.config.url.as_str())?;

        let new_connection_manager = timeout(self.config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StorageError::Timeout)??;

        let mut conn = self.connection_manager.write().await;
        *conn = new_connection_manager;

        info!("Reconnected to Redis");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let full_key = self.full_key(key);

        let result: Option<String> = self
            .execute_with_retry(|conn| {
                let full_key = full_key.clone();
                Box::pin(async move { conn.get::<_, Option<String>>(&full_key).await })
            })
            .await?;

        match &result {
            Some(_) => debug!("Redis hit for key: {}", key),
            None => debug!("Redis miss for key: {}", key),
        }

        Ok(result)
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);
        let value = value.to_string();

        self.execute_with_retry(|conn| {
            let full_key = full_key.clone();
            let value = value.clone();
            Box::pin(async move { conn.set::<_, _, ()>(&full_key, &value).await })
        })
        .await?;

        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        let full_key = self.full_key(key);
        let value = value.to_string();
        let ttl_seconds = ttl.as_secs();

        self.execute_with_retry(|conn| {
            let full_key = full_key.clone();
            let value = value.clone();
            Box::pin(async move { conn.set_ex::<_, _, ()>(&full_key, &value, ttl_seconds).await })
        })
        .await?;

        debug!("Set Redis key: {} with TTL: {:?}", key, ttl);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let full_keys: Vec<String> = keys.iter().map(|k| self.full_key(k)).collect();

        let deleted: i64 = self
            .execute_with_retry(|conn| {
                let full_keys = full_keys.clone();
                Box::pin(async move { conn.del(&full_keys).await })
            })
            .await?;

        debug!("Deleted {} of {} Redis keys", deleted, keys.len());
        Ok(deleted as usize)
    }

    async fn keys(&self, pattern: &str) -> StorageResult<Vec<String>> {
        let full_pattern = self.full_key(pattern);

        let keys: Vec<String> = self
            .execute_with_retry(|conn| {
                let pattern = full_pattern.clone();
                Box::pin(async move {
                    let mut cursor = 0u64;
                    let mut all_keys = Vec::new();

                    loop {
                        let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                            .arg(cursor)
                            .arg("MATCH")
                            .arg(&pattern)
                            .arg("COUNT")
                            .arg(1000)
                            .query_async(conn)
                            .await?;

                        all_keys.extend(keys);

                        if new_cursor == 0 {
                            break;
                        }
                        cursor = new_cursor;
                    }

                    Ok::<Vec<String>, redis::RedisError>(all_keys)
                })
            })
            .await?;

        // Strip the prefix so callers see the same keys they wrote
        Ok(keys
            .into_iter()
            .map(|k| {
                k.strip_prefix(&self.config.key_prefix)
                    .map(str::to_string)
                    .unwrap_or(k)
            })
            .collect())
    }

    async fn hget(&self, key: &str, field: &str) -> StorageResult<Option<String>> {
        let full_key = self.full_key(key);
        let field = field.to_string();

        let value: Option<String> = self
            .execute_with_retry(|conn| {
                let full_key = full_key.clone();
                let field = field.clone();
                Box::pin(async move { conn.hget::<_, _, Option<String>>(&full_key, &field).await })
            })
            .await?;

        Ok(value)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);
        let field = field.to_string();
        let value = value.to_string();

        self.execute_with_retry(|conn| {
            let full_key = full_key.clone();
            let field = field.clone();
            let value = value.clone();
            Box::pin(async move { conn.hset::<_, _, _, ()>(&full_key, &field, &value).await })
        })
        .await?;

        Ok(())
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StorageResult<i64> {
        let full_key = self.full_key(key);
        let field = field.to_string();

        let new_value: i64 = self
            .execute_with_retry(|conn| {
                let full_key = full_key.clone();
                let field = field.clone();
                Box::pin(async move { conn.hincr(&full_key, &field, delta).await })
            })
            .await?;

        Ok(new_value)
    }

    async fn hdel(&self, key: &str, field: &str) -> StorageResult<bool> {
        let full_key = self.full_key(key);
        let field = field.to_string();

        let deleted: i64 = self
            .execute_with_retry(|conn| {
                let full_key = full_key.clone();
                let field = field.clone();
                Box::pin(async move { conn.hdel(&full_key, &field).await })
            })
            .await?;

        Ok(deleted > 0)
    }

    async fn hgetall(&self, key: &str) -> StorageResult<HashMap<String, String>> {
        let full_key = self.full_key(key);

        let fields: HashMap<String, String> = self
            .execute_with_retry(|conn| {
                let full_key = full_key.clone();
                Box::pin(async move { conn.hgetall(&full_key).await })
            })
            .await?;

        Ok(fields)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        let full_key = self.full_key(key);
        let ttl_seconds = ttl.as_secs() as i64;

        let applied: i64 = self
            .execute_with_retry(|conn| {
                let full_key = full_key.clone();
                Box::pin(async move {
                    redis::cmd("EXPIRE")
                        .arg(&full_key)
                        .arg(ttl_seconds)
                        .query_async(conn)
                        .await
                })
            })
            .await?;

        Ok(applied > 0)
    }

    async fn ping(&self) -> StorageResult<()> {
        let response: String = self
            .execute_with_retry(|conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(conn).await })
            })
            .await?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }
}
