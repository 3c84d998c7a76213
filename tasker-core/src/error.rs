//! Error types for Tasker operations
//!
//! Three layers of errors live here:
//! - [`StoreError`]: failures of the persistent store (the origin)
//! - [`CacheError`]: failures of the cache store, always recovered internally
//! - [`TaskerError`]: what services surface to request handlers

use thiserror::Error;

/// Persistent store error
///
/// Payloads are rendered messages so the error can be cloned and handed to
/// every caller of a collapsed listing fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection error - network or connection pool issues
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Query execution error
    #[error("Query error: {0}")]
    QueryError(String),

    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A stored record could not be mapped back into a model type
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_ms}ms: {context}")]
    TimeoutError { timeout_ms: u64, context: String },
}

impl From<neo4rs::Error> for StoreError {
    fn from(e: neo4rs::Error) -> Self {
        StoreError::QueryError(e.to_string())
    }
}

/// Cache store error
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend unreachable or returned an error
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Operation exceeded the configured cache timeout
    #[error("Cache operation timed out after {0}ms")]
    Timeout(u64),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Entry larger than the whole cache budget
    #[error("Cache size limit exceeded: entry of {entry_bytes} bytes, limit {max_bytes} bytes")]
    SizeLimitExceeded { entry_bytes: usize, max_bytes: usize },
}

impl From<deadpool_redis::redis::RedisError> for CacheError {
    fn from(e: deadpool_redis::redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

/// Main error type surfaced by the task and user services
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskerError {
    /// Requested record does not exist at the origin
    #[error("{0} not found")]
    NotFound(String),

    /// Record exists but belongs to someone else
    #[error("permission denied")]
    PermissionDenied,

    /// Input rejected before reaching the store
    #[error("{0}")]
    Validation(String),

    /// Unique field already taken
    #[error("{0}")]
    Conflict(String),

    /// Unknown email or wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Persistent store failure, propagated as-is
    #[error(transparent)]
    Origin(#[from] StoreError),

    /// Background work failed (panicked or was aborted)
    #[error("internal error: {0}")]
    Internal(String),
}

impl TaskerError {
    pub fn task_not_found(id: u64) -> Self {
        TaskerError::NotFound(format!("task {}", id))
    }

    pub fn user_not_found(id: u64) -> Self {
        TaskerError::NotFound(format!("user {}", id))
    }
}

impl From<tokio::task::JoinError> for TaskerError {
    fn from(e: tokio::task::JoinError) -> Self {
        TaskerError::Internal(e.to_string())
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, TaskerError>;
