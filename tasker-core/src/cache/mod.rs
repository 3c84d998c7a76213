//! # Task Listing Cache
//!
//! Building blocks of the read-through cache in front of the persistent
//! store. The read path itself lives in
//! [`TaskService`](crate::service::TaskService); this module provides the
//! pieces it is assembled from.
//!
//! - [`key`]: derives `user:<id>:tasks:v1` keys
//! - [`jitter`]: spreads TTLs so entries written together expire apart
//! - [`collapse`]: single-flight collapsing of concurrent misses
//! - [`CacheStore`]: the backend seam, with [`RedisCache`] and [`MemoryCache`]
//!
//! ## Example
//!
//! ```rust
//! use tasker_core::cache::{CacheConfig, CacheStore, MemoryCache, task_list_key};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = MemoryCache::new(CacheConfig::default());
//! let key = task_list_key(42);
//!
//! cache.set(&key, b"[]".to_vec(), Duration::from_secs(60)).await?;
//! assert_eq!(cache.get(&key).await?, Some(b"[]".to_vec()));
//!
//! cache.delete(&key).await?;
//! # Ok(())
//! # }
//! ```

pub mod collapse;
pub mod config;
pub mod entry;
pub mod jitter;
pub mod key;
pub mod memory;
pub mod redis;
pub mod store;
pub mod types;

pub use collapse::RequestCollapser;
pub use config::{CacheConfig, CacheConfigBuilder, TASK_LIST_JITTER_RATIO};
pub use entry::CacheEntry;
pub use jitter::Jitter;
pub use key::task_list_key;
pub use memory::{start_auto_cleanup, MemoryCache};
pub use redis::RedisCache;
pub use store::CacheStore;
pub use types::{CacheKey, CacheStats, CacheValue};
