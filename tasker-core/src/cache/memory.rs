//! In-process cache backend with TTL expiry and LRU eviction

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    store::CacheStore,
    types::{CacheKey, CacheStats},
};
use crate::error::CacheError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Bounded in-memory cache
///
/// Entries expire after the TTL given to [`CacheStore::set`]. When the
/// entry or byte budget is reached the least recently used entries are
/// evicted first.
pub struct MemoryCache {
    config: CacheConfig,
    inner: RwLock<Entries>,
}

struct Entries {
    /// Main storage: key -> entry
    map: HashMap<CacheKey, CacheEntry>,

    /// LRU tracking, least recently used at the front
    lru_queue: VecDeque<CacheKey>,

    stats: CacheStats,

    current_size_bytes: usize,
}

impl Entries {
    fn touch(&mut self, key: &str) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.to_string());
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.map.remove(key)?;
        self.lru_queue.retain(|k| k != key);
        self.current_size_bytes = self.current_size_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn refresh_stats(&mut self) {
        self.stats.entries = self.map.len();
        self.stats.size_bytes = self.current_size_bytes;
    }
}

impl MemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        info!(
            "Initializing in-memory cache (max_entries: {}, max_size_bytes: {})",
            config.max_entries, config.max_size_bytes
        );

        Self {
            config,
            inner: RwLock::new(Entries {
                map: HashMap::new(),
                lru_queue: VecDeque::new(),
                stats: CacheStats::default(),
                current_size_bytes: 0,
            }),
        }
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats.clone()
    }

    /// Number of entries currently held, expired ones included until swept
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.map.is_empty()
    }

    /// Check for a live entry without touching LRU order or counters
    pub async fn contains_key(&self, key: &str) -> bool {
        self.inner
            .read()
            .await
            .map
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Clear all entries from the cache
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.map.len();
        inner.map.clear();
        inner.lru_queue.clear();
        inner.current_size_bytes = 0;
        inner.stats.invalidations += count as u64;
        inner.refresh_stats();

        info!("Cleared {} entries from cache", count);
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.write().await;

        let expired: Vec<CacheKey> = inner
            .map
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }
        inner.stats.evictions_ttl += expired.len() as u64;
        inner.refresh_stats();

        if !expired.is_empty() {
            debug!("Cleaned up {} expired entries", expired.len());
        }
        expired.len()
    }

    fn evict_for(&self, inner: &mut Entries, incoming_bytes: usize) {
        while inner.map.len() >= self.config.max_entries
            || inner.current_size_bytes + incoming_bytes > self.config.max_size_bytes
        {
            let Some(key) = inner.lru_queue.pop_front() else {
                break;
            };
            debug!("Evicting least recently used entry: {}", key);
            if let Some(entry) = inner.map.remove(&key) {
                inner.current_size_bytes = inner.current_size_bytes.saturating_sub(entry.size_bytes);
                inner.stats.evictions_size += 1;
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let expired = match inner.map.get_mut(key) {
            None => {
                inner.stats.misses += 1;
                debug!("Cache miss: {}", key);
                return Ok(None);
            }
            Some(entry) if entry.is_expired() => true,
            Some(entry) => {
                entry.mark_accessed();
                false
            }
        };

        if expired {
            debug!("Cache entry expired: {}", key);
            inner.remove(key);
            inner.stats.misses += 1;
            inner.stats.evictions_ttl += 1;
            inner.refresh_stats();
            return Ok(None);
        }

        inner.touch(key);
        inner.stats.hits += 1;
        debug!("Cache hit: {}", key);
        Ok(inner.map.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value, ttl);
        if entry.size_bytes > self.config.max_size_bytes {
            return Err(CacheError::SizeLimitExceeded {
                entry_bytes: entry.size_bytes,
                max_bytes: self.config.max_size_bytes,
            });
        }

        let mut inner = self.inner.write().await;

        // Replacing an entry frees its slot before we decide what to evict
        inner.remove(key);
        self.evict_for(&mut inner, entry.size_bytes);

        inner.current_size_bytes += entry.size_bytes;
        inner.map.insert(key.to_string(), entry);
        inner.touch(key);
        inner.refresh_stats();

        debug!("Stored cache entry: {} (ttl: {:?})", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut inner = self.inner.write().await;
        if inner.remove(key).is_some() {
            inner.stats.invalidations += 1;
            inner.refresh_stats();
            debug!("Removed cache entry: {}", key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Background task that sweeps expired entries every `cleanup_interval`
pub async fn start_auto_cleanup(cache: Arc<MemoryCache>) {
    let interval = cache.config.cleanup_interval;

    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let removed = cache.cleanup_expired().await;
        if removed > 0 {
            debug!("Auto cleanup removed {} entries", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(max_entries: usize) -> MemoryCache {
        MemoryCache::new(
            CacheConfig::builder()
                .max_entries(max_entries)
                .enable_auto_cleanup(false)
                .build(),
        )
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let cache = cache_with(100);

        cache.set("key1", b"value1".to_vec(), MINUTE).await.unwrap();

        let value = cache.get("key1").await.unwrap();
        assert_eq!(value, Some(b"value1".to_vec()));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = cache_with(100);

        assert_eq!(cache.get("nonexistent").await.unwrap(), None);
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = cache_with(100);

        cache
            .set("key1", b"value1".to_vec(), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(cache.get("key1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get("key1").await.unwrap().is_none());
        assert_eq!(cache.stats().await.evictions_ttl, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = cache_with(3);

        cache.set("key1", b"1".to_vec(), MINUTE).await.unwrap();
        cache.set("key2", b"2".to_vec(), MINUTE).await.unwrap();
        cache.set("key3", b"3".to_vec(), MINUTE).await.unwrap();

        // key1 becomes most recently used, so key2 is evicted next
        cache.get("key1").await.unwrap();
        cache.set("key4", b"4".to_vec(), MINUTE).await.unwrap();

        assert!(!cache.contains_key("key2").await);
        assert!(cache.contains_key("key1").await);
        assert!(cache.contains_key("key3").await);
        assert!(cache.contains_key("key4").await);
        assert_eq!(cache.stats().await.evictions_size, 1);
    }

    #[tokio::test]
    async fn test_size_budget_eviction() {
        let cache = MemoryCache::new(
            CacheConfig::builder()
                .max_size_bytes(20)
                .enable_auto_cleanup(false)
                .build(),
        );

        cache.set("a", vec![0; 9], MINUTE).await.unwrap();
        cache.set("b", vec![0; 9], MINUTE).await.unwrap();
        cache.set("c", vec![0; 9], MINUTE).await.unwrap();

        assert!(!cache.contains_key("a").await);
        assert!(cache.contains_key("c").await);
        assert!(cache.stats().await.size_bytes <= 20);

        let err = cache.set("d", vec![0; 64], MINUTE).await.unwrap_err();
        assert!(matches!(err, CacheError::SizeLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_set_replaces_existing_entry() {
        let cache = cache_with(2);

        cache.set("key1", b"old".to_vec(), MINUTE).await.unwrap();
        cache.set("key1", b"new".to_vec(), MINUTE).await.unwrap();
        cache.set("key2", b"2".to_vec(), MINUTE).await.unwrap();

        assert_eq!(cache.get("key1").await.unwrap(), Some(b"new".to_vec()));
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.stats().await.evictions_size, 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = cache_with(10);

        cache.set("key1", b"value1".to_vec(), MINUTE).await.unwrap();
        cache.delete("key1").await.unwrap();
        cache.delete("key1").await.unwrap();

        assert!(cache.get("key1").await.unwrap().is_none());
        assert_eq!(cache.stats().await.invalidations, 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let cache = cache_with(10);

        cache
            .set("key1", b"1".to_vec(), Duration::from_millis(30))
            .await
            .unwrap();
        cache
            .set("key2", b"2".to_vec(), Duration::from_millis(30))
            .await
            .unwrap();
        cache.set("key3", b"3".to_vec(), MINUTE).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.cleanup_expired().await, 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = cache_with(10);

        cache.set("key1", b"1".to_vec(), MINUTE).await.unwrap();
        cache.set("key2", b"2".to_vec(), MINUTE).await.unwrap();
        cache.clear().await;

        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().await.size_bytes, 0);
    }

    #[tokio::test]
    async fn test_auto_cleanup_sweeps_in_background() {
        let cache = Arc::new(MemoryCache::new(
            CacheConfig::builder()
                .cleanup_interval(Duration::from_millis(20))
                .build(),
        ));
        let sweeper = tokio::spawn(start_auto_cleanup(Arc::clone(&cache)));

        cache
            .set("key1", b"1".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.len().await, 0);
        sweeper.abort();
    }
}
