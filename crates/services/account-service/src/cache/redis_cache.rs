//! Redis cache implementation.
//!
//! Values are stored as JSON under a key namespace with `SET EX`, so expiry
//! is enforced by Redis itself.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{de::DeserializeOwned, Serialize};

use super::Cache;
use common::{AppError, AppResult};

/// Redis-backed cache for a single value type.
pub struct RedisCache<V> {
    connection: ConnectionManager,
    namespace: String,
    _value: PhantomData<fn() -> V>,
}

impl<V> Clone for RedisCache<V> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            namespace: self.namespace.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> RedisCache<V> {
    /// Connect to Redis. Every key is prefixed with `namespace`.
    pub async fn connect(url: &str, namespace: impl Into<String>) -> AppResult<Self> {
        let client = Client::open(url).map_err(cache_error)?;
        let connection = ConnectionManager::new(client).await.map_err(cache_error)?;

        tracing::info!("Redis cache connected");

        Ok(Self {
            connection,
            namespace: namespace.into(),
            _value: PhantomData,
        })
    }

    fn key(&self, key: &str) -> String {
        namespaced_key(&self.namespace, key)
    }
}

#[async_trait]
impl<V> Cache<V> for RedisCache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> AppResult<Option<V>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(self.key(key)).await.map_err(cache_error)?;

        match value {
            Some(json) => match serde_json::from_str(&json) {
                Ok(parsed) => Ok(Some(parsed)),
                Err(e) => {
                    // Payload written by an older schema; the repository
                    // read that follows will overwrite it.
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(&value)
            .map_err(|e| AppError::cache(format!("serialization failed: {}", e)))?;

        conn.set_ex::<_, _, ()>(self.key(key), json, ttl_seconds(ttl))
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(self.key(key)).await.map_err(cache_error)?;
        Ok(())
    }
}

fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{}{}", namespace, key)
}

/// `SET EX` takes whole seconds; round up and never pass zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    let seconds = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0));
    seconds.max(1)
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::cache(e)
}
