//! Redis cache backend on a deadpool connection pool

use crate::cache::store::CacheStore;
use crate::error::CacheError;
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed [`CacheStore`]
///
/// Every round trip, including checking a connection out of the pool, is
/// bounded by `op_timeout` so a slow Redis degrades to origin reads.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    op_timeout: Duration,
}

impl RedisCache {
    /// Create a pool for `url`; no connection is opened until first use
    pub fn new(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Backend(format!("Failed to create Redis pool: {}", e)))?;

        info!("Redis cache configured (op timeout: {:?})", op_timeout);
        Ok(Self { pool, op_timeout })
    }

    /// Build a `redis://` URL from address, optional password and database index
    pub fn connection_url(addr: &str, password: Option<&str>, db: i64) -> String {
        match password.filter(|p| !p.is_empty()) {
            Some(password) => format!("redis://:{}@{}/{}", password, addr, db),
            None => format!("redis://{}/{}", addr, db),
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout.as_millis() as u64))?
    }

    async fn connection(&self) -> Result<Connection, CacheError> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let value: Option<Vec<u8>> = conn.get(key).await?;
            debug!(
                "Redis GET {}: {}",
                key,
                if value.is_some() { "hit" } else { "miss" }
            );
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        // PSETEX rejects a zero expiry
        let ttl_ms = u64::try_from(ttl.as_millis().max(1)).unwrap_or(u64::MAX);

        self.bounded(async {
            let mut conn = self.connection().await?;
            redis::cmd("PSETEX")
                .arg(key)
                .arg(ttl_ms)
                .arg(value)
                .query_async::<()>(&mut conn)
                .await?;
            debug!("Redis PSETEX {} ({}ms)", key, ttl_ms);
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let removed: u64 = conn.del(key).await?;
            debug!("Redis DEL {} (removed: {})", key, removed);
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
            if reply == "PONG" {
                Ok(())
            } else {
                Err(CacheError::Backend(format!("Unexpected PING reply: {}", reply)))
            }
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url() {
        assert_eq!(
            RedisCache::connection_url("localhost:6379", None, 0),
            "redis://localhost:6379/0"
        );
        assert_eq!(
            RedisCache::connection_url("cache:6380", Some(""), 2),
            "redis://cache:6380/2"
        );
        assert_eq!(
            RedisCache::connection_url("cache:6380", Some("s3cret"), 1),
            "redis://:s3cret@cache:6380/1"
        );
    }

    #[tokio::test]
    async fn test_unreachable_redis_times_out_or_errors() {
        // Port 1 is reserved; connecting fails fast or hangs until the op timeout
        let cache = RedisCache::new("redis://127.0.0.1:1/0", Duration::from_millis(100)).unwrap();

        assert!(cache.get("user:1:tasks:v1").await.is_err());
        assert!(cache.delete("user:1:tasks:v1").await.is_err());
        assert!(cache.ping().await.is_err());
    }
}
