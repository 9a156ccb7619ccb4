use redis::AsyncCommands;
use redis::Client;

use crate::{db::KeyValueStore, error::AppResult};

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for durable dataset caching.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed key-value store
///
/// Batch writes go through `MSET` and batch removals through a multi-key
/// `DEL`; Redis applies each as a single atomic command.
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await.map_err(|e| {
            tracing::warn!(error = %e, key = %key, "Redis get failed");
            e
        })?;
        Ok(value)
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.mset(&entries).await.map_err(|e| {
            tracing::warn!(error = %e, keys = entries.len(), "Redis MSET failed");
            e
        })?;

        tracing::debug!(keys = entries.len(), "Persisted entries to Redis");
        Ok(())
    }

    async fn remove_many(&self, keys: Vec<String>) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(&keys).await.map_err(|e| {
            tracing::warn!(error = %e, keys = keys.len(), "Redis DEL failed");
            e
        })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// These tests need a live Redis; set REDIS_URL or run one on localhost.
