//! Redis cache, for deployments running more than one process

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Keys fetched per SCAN round in `delete_pattern`
const SCAN_COUNT: usize = 100;

pub struct RedisCache {
    connection: MultiplexedConnection,
    /// Upper bound applied to every requested TTL
    max_ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("max_ttl", &self.max_ttl)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    pub async fn with_ttl(redis_url: &str, max_ttl: Duration) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            connection,
            max_ttl,
        })
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();
        let result: Option<String> = conn
            .get(key)
            .await
            .context("Failed to get value from Redis")?;

        match result {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("Failed to deserialize cached value")?,
            )),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        let ttl_secs = ttl.min(self.max_ttl).as_secs().max(1);

        let _: () = conn
            .set_ex(key, json, ttl_secs)
            .await
            .context("Failed to set value in Redis")?;
        Ok(())
    }

    /// SCAN + DEL rather than KEYS, which blocks the server.
    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .context("Failed to scan keys in Redis")?;

            if !keys.is_empty() {
                let _: () = conn
                    .del(&keys)
                    .await
                    .context("Failed to delete keys from Redis")?;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(())
    }
}
