use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use super::CacheBackend;
use crate::error::AppResult;

/// Creates a Redis client from a connection URL.
///
/// The client is lazy; no connection is attempted until the first command.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    tracing::info!("Redis client created");
    Ok(client)
}

/// Redis-backed cache storage.
pub struct RedisBackend {
    client: Client,
}

impl RedisBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn index_add(&self, set_key: &str, member: &str, ttl: u64) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.sadd(set_key, member).await?;
        let _: () = conn.expire(set_key, ttl as i64).await?;
        Ok(())
    }

    async fn index_members(&self, set_key: &str) -> AppResult<Vec<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.smembers(set_key).await?)
    }
}
