//! The cache store seam
//!
//! Everything above this trait treats the cache as optional and fallible:
//! a [`CacheError`] is logged and the caller falls back to the origin.

use crate::error::CacheError;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value cache with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the bytes stored under `key`, `None` on a miss
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key`, replacing any previous entry, expiring after `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`; removing an absent key succeeds
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Verify the backend is reachable
    async fn ping(&self) -> Result<(), CacheError>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}
