//! Cache entry with TTL bookkeeping for the in-memory backend

use crate::cache::types::CacheValue;
use std::time::{Duration, Instant};

/// Longest lifetime an entry can be given; larger TTLs are clamped
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A stored value and its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub expires_at: Instant,
    pub accessed_at: Instant,
    pub access_count: u64,
    pub size_bytes: usize,
}

impl CacheEntry {
    /// Create an entry for `key` that expires `ttl` from now
    pub fn new(key: &str, value: CacheValue, ttl: Duration) -> Self {
        let now = Instant::now();
        let size_bytes = key.len() + value.len();

        Self {
            value,
            expires_at: now + ttl.min(MAX_ENTRY_TTL),
            accessed_at: now,
            access_count: 0,
            size_bytes,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        self.expires_at.checked_duration_since(Instant::now())
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self) {
        self.accessed_at = Instant::now();
        self.access_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_unbounded_ttl_is_clamped() {
        let entry = CacheEntry::new("k", b"v".to_vec(), Duration::MAX);

        assert!(!entry.is_expired());
        let remaining = entry.time_until_expiration().unwrap();
        assert!(remaining <= MAX_ENTRY_TTL);
        assert!(remaining > MAX_ENTRY_TTL - Duration::from_secs(60));
    }

    #[test]
    fn test_cache_entry_creation() {
        let entry = CacheEntry::new("user:1:tasks:v1", b"[]".to_vec(), Duration::from_secs(60));

        assert_eq!(entry.value, b"[]".to_vec());
        assert_eq!(entry.size_bytes, "user:1:tasks:v1".len() + 2);
        assert!(!entry.is_expired());
        assert_eq!(entry.access_count, 0);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("k", b"v".to_vec(), Duration::from_millis(50));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
        assert!(entry.time_until_expiration().is_none());
    }

    #[test]
    fn test_mark_accessed() {
        let mut entry = CacheEntry::new("k", b"v".to_vec(), Duration::from_secs(60));
        let initial_time = entry.accessed_at;

        sleep(Duration::from_millis(5));
        entry.mark_accessed();

        assert_eq!(entry.access_count, 1);
        assert!(entry.accessed_at > initial_time);
    }

    #[test]
    fn test_time_until_expiration() {
        let entry = CacheEntry::new("k", b"v".to_vec(), Duration::from_secs(60));

        let time_left = entry.time_until_expiration().unwrap();
        assert!(time_left <= Duration::from_secs(60));
        assert!(time_left > Duration::from_secs(59));
    }
}
