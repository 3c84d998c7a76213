//! Configuration for the cache system

use crate::cache::jitter::Jitter;
use std::time::Duration;

/// Spread applied to every task listing TTL
pub const TASK_LIST_JITTER_RATIO: f64 = 0.1;

/// Cache settings shared by the read path and the in-memory backend
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Base time-to-live of a cached task listing, before jitter
    pub task_list_ttl: Duration,

    /// Lower bound of a jittered TTL
    pub min_ttl: Duration,

    /// Upper bound on a single cache round trip (Redis backend)
    pub op_timeout: Duration,

    /// Maximum number of entries held by the in-memory backend
    pub max_entries: usize,

    /// Maximum total size of the in-memory backend in bytes
    pub max_size_bytes: usize,

    /// Run the background sweeper for the in-memory backend
    pub enable_auto_cleanup: bool,

    /// How often the sweeper looks for expired entries
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            task_list_ttl: Duration::from_secs(60),
            min_ttl: Duration::from_secs(1),
            op_timeout: Duration::from_millis(250),
            max_entries: 10_000,
            // 64 MB
            max_size_bytes: 64 * 1024 * 1024,
            enable_auto_cleanup: true,
            cleanup_interval: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.task_list_ttl.is_zero() {
            return Err("task_list_ttl must be greater than 0".to_string());
        }

        if self.op_timeout.is_zero() {
            return Err("op_timeout must be greater than 0".to_string());
        }

        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }

        if self.max_size_bytes == 0 {
            return Err("max_size_bytes must be greater than 0".to_string());
        }

        if self.enable_auto_cleanup && self.cleanup_interval.is_zero() {
            return Err("cleanup_interval must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Jittered TTL for a freshly loaded task listing
    pub fn task_list_ttl_with_jitter(&self, jitter: &Jitter) -> Duration {
        jitter.ttl(
            self.task_list_ttl,
            TASK_LIST_JITTER_RATIO,
            Some(self.min_ttl),
        )
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    task_list_ttl: Option<Duration>,
    min_ttl: Option<Duration>,
    op_timeout: Option<Duration>,
    max_entries: Option<usize>,
    max_size_bytes: Option<usize>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
}

impl CacheConfigBuilder {
    pub fn task_list_ttl(mut self, ttl: Duration) -> Self {
        self.task_list_ttl = Some(ttl);
        self
    }

    pub fn min_ttl(mut self, ttl: Duration) -> Self {
        self.min_ttl = Some(ttl);
        self
    }

    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    pub fn max_size_bytes(mut self, size: usize) -> Self {
        self.max_size_bytes = Some(size);
        self
    }

    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            task_list_ttl: self.task_list_ttl.unwrap_or(defaults.task_list_ttl),
            min_ttl: self.min_ttl.unwrap_or(defaults.min_ttl),
            op_timeout: self.op_timeout.unwrap_or(defaults.op_timeout),
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            max_size_bytes: self.max_size_bytes.unwrap_or(defaults.max_size_bytes),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.task_list_ttl, Duration::from_secs(60));
        assert_eq!(config.min_ttl, Duration::from_secs(1));
        assert_eq!(config.op_timeout, Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut invalid_config = CacheConfig::default();
        invalid_config.task_list_ttl = Duration::ZERO;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = CacheConfig::default();
        invalid_config.max_entries = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = CacheConfig::default();
        invalid_config.cleanup_interval = Duration::ZERO;
        assert!(invalid_config.validate().is_err());

        invalid_config.enable_auto_cleanup = false;
        assert!(invalid_config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .task_list_ttl(Duration::from_secs(300))
            .max_entries(5000)
            .op_timeout(Duration::from_millis(100))
            .build();

        assert_eq!(config.task_list_ttl, Duration::from_secs(300));
        assert_eq!(config.max_entries, 5000);
        assert_eq!(config.op_timeout, Duration::from_millis(100));
        assert_eq!(config.min_ttl, Duration::from_secs(1));
    }

    #[test]
    fn test_task_list_ttl_with_jitter() {
        let config = CacheConfig::default();
        let jitter = Jitter::new();

        for _ in 0..100 {
            let ttl = config.task_list_ttl_with_jitter(&jitter);
            assert!(ttl.as_secs_f64() >= 54.0);
            assert!(ttl.as_secs_f64() <= 66.0);
        }
    }

    #[test]
    fn test_short_ttl_respects_minimum() {
        let config = CacheConfig::builder()
            .task_list_ttl(Duration::from_millis(900))
            .build();
        let jitter = Jitter::seeded(1);

        for _ in 0..100 {
            assert!(config.task_list_ttl_with_jitter(&jitter) >= Duration::from_secs(1));
        }
    }
}
