use super::{CacheError, CacheStore, CachedWeather};
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// In-process store. Bounded by entry count; moka also drops entries once
/// they outlive the TTL.
pub struct MemoryStore {
    cache: Cache<String, CachedWeather>,
}

impl MemoryStore {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CachedWeather>, CacheError> {
        Ok(self.cache.get(key).await)
    }

    async fn put(&self, key: &str, entry: CachedWeather) -> Result<(), CacheError> {
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.cache.invalidate_all();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
