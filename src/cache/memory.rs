//! In-memory cache backed by moka

use super::{pattern_matches, CacheLayer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Serialized value plus the TTL it was stored with
#[derive(Clone)]
struct CacheEntry {
    data: Arc<String>,
    ttl: Duration,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T, ttl: Duration) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
            ttl,
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// Expires each entry after the TTL it was stored with
struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    /// Upper bound applied to every requested TTL
    max_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("max_ttl", &self.max_ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_capacity_and_ttl(max_capacity: u64, max_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache, max_ttl }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl.min(self.max_ttl))?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        // Walks every key; fine for the handful of feed pages we keep.
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| pattern_matches(pattern, key.as_str()))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        for key in keys {
            self.cache.invalidate(&key).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache
            .set("key1", &vec![1, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<Vec<i32>> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some(vec![1, 2, 3]));
        let missing: Option<Vec<i32>> = cache.get("key2").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_own_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("short", &"x".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        cache
            .set("long", &"y".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        let short: Option<String> = cache.get("short").await.unwrap();
        let long: Option<String> = cache.get("long").await.unwrap();
        assert_eq!(short, None);
        assert_eq!(long.as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_ttl_is_capped() {
        let cache = MemoryCache::with_capacity_and_ttl(10, Duration::from_millis(20));
        cache
            .set("key", &1u8, Duration::from_secs(3600))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        let value: Option<u8> = cache.get("key").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("feed:index:page:1", &1, ttl).await.unwrap();
        cache.set("feed:index:page:2", &2, ttl).await.unwrap();
        cache.set("other", &3, ttl).await.unwrap();

        cache.delete_pattern("feed:index:*").await.unwrap();

        assert_eq!(cache.get::<i32>("feed:index:page:1").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("feed:index:page:2").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("other").await.unwrap(), Some(3));
    }
}
