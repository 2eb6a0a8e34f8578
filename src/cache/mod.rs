pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache store timed out during {0}")]
    Timeout(&'static str),
}

/// Deterministic key for one logical weather lookup.
///
/// City and coordinate lookups live in disjoint namespaces, so they never
/// collide even when they resolve to the same place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn city(city: &str, units: &str) -> Self {
        Self(format!("city:{}:{}", city, units))
    }

    pub fn coords(lat: &str, lon: &str, units: &str) -> Self {
        Self(format!("coords:{}:{}:{}", lat, lon, units))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedWeather {
    pub payload: Value,
    pub stored_at: DateTime<Utc>,
}

impl CachedWeather {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            stored_at: Utc::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        let age_ms = Utc::now()
            .signed_duration_since(self.stored_at)
            .num_milliseconds();
        age_ms < ttl.as_millis() as i64
    }
}

/// Backing key-value store for [`WeatherCache`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedWeather>, CacheError>;
    async fn put(&self, key: &str, entry: CachedWeather) -> Result<(), CacheError>;
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
    fn name(&self) -> &'static str;
}

/// TTL cache of weather payloads, shared by the proxy handler and the
/// API client.
#[derive(Clone)]
pub struct WeatherCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn in_memory(ttl: Duration, max_entries: u64) -> Self {
        Self::new(Arc::new(MemoryStore::new(ttl, max_entries)), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Stored payload for `key`, if one exists and is younger than the TTL.
    /// Expired entries are dropped on the way out.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        match self.store.get(key.as_str()).await? {
            Some(entry) if entry.is_fresh(self.ttl) => Ok(Some(entry.payload)),
            Some(_) => {
                tracing::debug!("Evicting expired cache entry {}", key);
                self.store.remove(key.as_str()).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &CacheKey, payload: Value) -> Result<(), CacheError> {
        self.store
            .put(key.as_str(), CachedWeather::new(payload))
            .await
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.clear().await
    }
}
