//! # In-Memory Stores
//!
//! In-memory implementations of [`KeyValueStore`] and [`ObjectStore`].
//! These back the test suites and local development without Redis or an
//! object store, honoring the same expiry semantics as the real stores.

use super::{KeyValueStore, ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A single stored entry: either a plain string or a grouped (hash) record
#[derive(Debug, Clone)]
enum Entry {
    Value {
        value: String,
        expires_at: Option<Instant>,
    },
    Hash {
        fields: HashMap<String, String>,
        expires_at: Option<Instant>,
    },
}

impl Entry {
    fn is_expired(&self) -> bool {
        let expires_at = match self {
            Entry::Value { expires_at, .. } => expires_at,
            Entry::Hash { expires_at, .. } => expires_at,
        };
        matches!(expires_at, Some(deadline) if *deadline <= Instant::now())
    }

    fn set_expiry(&mut self, deadline: Option<Instant>) {
        match self {
            Entry::Value { expires_at, .. } => *expires_at = deadline,
            Entry::Hash { expires_at, .. } => *expires_at = deadline,
        }
    }
}

/// In-memory key-value store
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL of a live key; `None` for absent or non-expiring keys.
    /// Inspection helper for tests asserting the TTL policy.
    pub async fn ttl_of(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.is_expired() {
            return None;
        }
        let expires_at = match entry {
            Entry::Value { expires_at, .. } => expires_at,
            Entry::Hash { expires_at, .. } => expires_at,
        };
        expires_at.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Drop expired entries
    async fn purge_expired(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired());
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => Ok(None),
            Some(Entry::Value { value, .. }) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry::Value {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry::Value {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<usize> {
        let mut entries = self.entries.write().await;
        let mut deleted = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired() {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn keys(&self, pattern: &str) -> StorageResult<Vec<String>> {
        self.purge_expired().await;

        let regex = Regex::new(&format!("^{}$", regex::escape(pattern).replace(r"\*", ".*")))
            .map_err(|e| StorageError::object(format!("Invalid key pattern: {}", e)))?;

        let entries = self.entries.read().await;
        Ok(entries.keys().filter(|k| regex.is_match(k)).cloned().collect())
    }

    async fn hget(&self, key: &str, field: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => Ok(None),
            Some(Entry::Hash { fields, .. }) => Ok(fields.get(field).cloned()),
            _ => Ok(None),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;

        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_expired() {
                    *entry = Entry::Hash {
                        fields: HashMap::new(),
                        expires_at: None,
                    };
                }
            })
            .or_insert_with(|| Entry::Hash {
                fields: HashMap::new(),
                expires_at: None,
            });

        match entry {
            Entry::Hash { fields, .. } => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Entry::Value { .. } => Err(StorageError::object(format!(
                "Key {} holds a string, not a hash",
                key
            ))),
        }
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StorageResult<i64> {
        let mut entries = self.entries.write().await;

        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_expired() {
                    *entry = Entry::Hash {
                        fields: HashMap::new(),
                        expires_at: None,
                    };
                }
            })
            .or_insert_with(|| Entry::Hash {
                fields: HashMap::new(),
                expires_at: None,
            });

        match entry {
            Entry::Hash { fields, .. } => {
                let current: i64 = fields
                    .get(field)
                    .map(|v| v.parse())
                    .transpose()
                    .map_err(|_| StorageError::object(format!("Field {} is not an integer", field)))?
                    .unwrap_or(0);

                let updated = current + delta;
                fields.insert(field.to_string(), updated.to_string());
                Ok(updated)
            }
            Entry::Value { .. } => Err(StorageError::object(format!(
                "Key {} holds a string, not a hash",
                key
            ))),
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> StorageResult<bool> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.is_expired() => Ok(false),
            Some(Entry::Hash { fields, .. }) => Ok(fields.remove(field).is_some()),
            _ => Ok(false),
        }
    }

    async fn hgetall(&self, key: &str) -> StorageResult<HashMap<String, String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => Ok(HashMap::new()),
            Some(Entry::Hash { fields, .. }) => Ok(fields.clone()),
            _ => Ok(HashMap::new()),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.set_expiry(Some(Instant::now() + ttl));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// In-memory object store
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object, overwriting any existing one
    pub async fn put(&self, bucket: &str, object: &str, data: Vec<u8>) {
        let mut objects = self.objects.write().await;
        objects.insert((bucket.to_string(), object.to_string()), data);
    }

    /// Remove an object
    pub async fn remove(&self, bucket: &str, object: &str) {
        let mut objects = self.objects.write().await;
        objects.remove(&(bucket.to_string(), object.to_string()));
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, bucket: &str, object: &str) -> StorageResult<Option<Vec<u8>>> {
        let objects = self.objects.read().await;
        Ok(objects.get(&(bucket.to_string(), object.to_string())).cloned())
    }
}
