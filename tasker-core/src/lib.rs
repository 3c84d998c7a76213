//! # Tasker Core (tasker-core)
//!
//! Storage, caching and use cases behind the Tasker task API.
//!
//! ## Features
//!
//! - Task and user persistence in Neo4j, or in memory for development
//! - Read-through cache for per-user task listings (Redis or in-process)
//! - Single-flight collapsing of concurrent cache misses
//! - Jittered TTLs so listings cached together do not expire together
//! - Whole-listing invalidation after every task mutation
//! - Argon2id password hashing
//!
//! ## Listing tasks through the cache
//!
//! ```rust
//! use std::sync::Arc;
//! use tasker_core::{
//!     cache::{CacheConfig, CacheStore, MemoryCache},
//!     schema::NewTask,
//!     service::TaskService,
//!     store::MemoryStore,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new(CacheConfig::default()));
//! let tasks = TaskService::new(store, Some(cache), CacheConfig::default());
//!
//! tasks.create_task(NewTask::new(1, "Buy milk", "")).await?;
//!
//! // First call loads from the store and fills the cache, the second is a hit
//! let listing = tasks.list_for_owner(1).await?;
//! assert_eq!(listing, tasks.list_for_owner(1).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Neo4j backend
//!
//! ```no_run
//! use tasker_core::{Neo4jClient, store::Neo4jStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Neo4jClient::new(
//!         "bolt://localhost:7687",
//!         "neo4j",
//!         "password",
//!         "neo4j"
//!     ).await?;
//!     client.ensure_schema().await?;
//!
//!     let result = client.health_check_detailed().await;
//!     println!("Status: {:?} in {}ms", result.status, result.response_time_ms);
//!
//!     let _store = Neo4jStore::new(client);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod connection;
pub mod error;
pub mod schema;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheStore, MemoryCache, RedisCache};
pub use connection::{HealthCheckConfig, HealthCheckResult, HealthStatus, Neo4jClient};
pub use error::{CacheError, Result, StoreError, TaskerError};
pub use service::{TaskService, UserService};
pub use store::{MemoryStore, Neo4jStore, TaskStore, UserStore};
