//! Redis-backed session cache.
//!
//! Keys are namespaced under a prefix (default `tabkeep:`) and every command
//! is bounded by an operation deadline so a stalled Redis turns into
//! `CacheError::Unavailable` instead of a hung request.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::instrument;

use super::{CacheError, KeyValueCache};

/// Default key namespace.
const DEFAULT_PREFIX: &str = "tabkeep:";

#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
    prefix: String,
    op_timeout: Duration,
}

impl RedisCache {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - e.g. "redis://localhost:6379"
    /// * `prefix` - key namespace (default: "tabkeep:")
    /// * `op_timeout` - deadline applied to every command
    pub async fn connect(
        redis_url: impl AsRef<str>,
        prefix: Option<String>,
        op_timeout: Duration,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        let conn = tokio::time::timeout(op_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Unavailable("redis connect timed out".to_string()))?
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(Self {
            conn,
            prefix: prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            op_timeout,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        with_deadline(op, self.op_timeout, fut).await
    }
}

async fn with_deadline<T, F>(op: &'static str, deadline: Duration, fut: F) -> Result<T, CacheError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CacheError::Backend(format!("{op}: {e}"))),
        Err(_) => Err(CacheError::Unavailable(format!(
            "{op} exceeded {}ms",
            deadline.as_millis()
        ))),
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    #[instrument(skip(self, key, value), fields(ttl_secs = ttl.as_secs()), err)]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        // Redis rejects EX 0.
        cmd.arg(self.key(key)).arg(value).arg("EX").arg(ttl.as_secs().max(1));

        self.bounded("SET", cmd.query_async::<_, ()>(&mut conn)).await
    }

    #[instrument(skip(self, key))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(self.key(key));

        let value: Option<Vec<u8>> = self
            .bounded("GET", cmd.query_async::<_, Option<Vec<u8>>>(&mut conn))
            .await?;
        value.ok_or(CacheError::NotFound)
    }

    #[instrument(skip(self, keys), fields(count = keys.len()), err)]
    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(self.key(key));
        }

        let _removed: i64 = self
            .bounded("DEL", cmd.query_async::<_, i64>(&mut conn))
            .await?;
        Ok(())
    }
}
