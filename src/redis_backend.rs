//! Redis implementation of [`KeyValueBackend`].
//!
//! Order writes go out as one `MULTI`/`EXEC` pipeline.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;

use crate::backend::{KeyValueBackend, OrderWrite};
use crate::store_errors::StoreError;

/// Redis-backed storage for orders, user pointers and the admin set
pub struct RedisBackend {
    client: redis::Client,
}

impl RedisBackend {
    /// Create a new backend from a connection URL.
    ///
    /// Only validates the URL; the first command opens the connection.
    pub fn new(connection_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_url)
            .map_err(|e| StoreError::Configuration(e.to_string()))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.hget(key, field).await?)
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut conn = self.connection().await?;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields.into_iter().collect())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.exists(key).await?)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let deleted: u64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn write_order(&self, write: &OrderWrite) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;

        // MULTI/EXEC: a dropped connection before EXEC applies nothing
        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(previous) = &write.previous_hash {
            pipe.hdel(previous, &write.field).ignore();
        }
        pipe.hset(&write.hash_key, &write.field, &write.value)
            .ignore()
            .cmd("EXPIREAT")
            .arg(&write.hash_key)
            .arg(write.expires_at)
            .ignore()
            .set(&write.pointer_key, &write.pointer_value)
            .ignore()
            .cmd("EXPIREAT")
            .arg(&write.pointer_key)
            .arg(write.expires_at)
            .ignore();

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.keys(pattern).await?)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.smembers(key).await?)
    }
}
