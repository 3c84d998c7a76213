//! Neo4j connection management and health checks
//!
//! [`Neo4jClient`] owns the pooled `neo4rs::Graph` used by
//! [`Neo4jStore`](crate::store::Neo4jStore), creates the uniqueness
//! constraints the task and user schema rely on, and answers health checks.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use neo4rs::{query, ConfigBuilder, Graph};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

type Result<T> = std::result::Result<T, StoreError>;

/// Constraints created on startup
const SCHEMA_CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT task_id IF NOT EXISTS FOR (t:Task) REQUIRE t.id IS UNIQUE",
    "CREATE CONSTRAINT user_id IF NOT EXISTS FOR (u:User) REQUIRE u.id IS UNIQUE",
    "CREATE CONSTRAINT user_email IF NOT EXISTS FOR (u:User) REQUIRE u.email IS UNIQUE",
    "CREATE CONSTRAINT sequence_name IF NOT EXISTS FOR (s:Sequence) REQUIRE s.name IS UNIQUE",
];

const HEALTH_CHECK_TIMED_OUT: &str = "health check timed out";

/// Configuration for health check behavior
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Timeout for health check operations
    pub timeout: Duration,
    /// Response time threshold for degraded state (in milliseconds)
    pub degraded_threshold_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            degraded_threshold_ms: 1000,
        }
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Database is healthy and responsive
    Healthy,
    /// Database is responsive but slow (above degraded threshold)
    Degraded,
    /// Database is not responsive or erroring
    Unhealthy,
}

impl HealthStatus {
    /// Convert to HTTP status code equivalent
    pub fn to_http_status_code(&self) -> u16 {
        match self {
            HealthStatus::Healthy => 200,
            HealthStatus::Degraded => 200,
            HealthStatus::Unhealthy => 503,
        }
    }

    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Overall health status
    pub status: HealthStatus,
    /// Response time in milliseconds
    pub response_time_ms: u64,
    /// Timestamp of the health check
    pub timestamp: DateTime<Utc>,
    /// Error message (if unhealthy)
    pub error: Option<String>,
}

impl HealthCheckResult {
    /// Create a result for a successful probe, degraded when slow
    pub fn responsive(response_time: Duration, degraded_threshold_ms: u64) -> Self {
        let response_time_ms = response_time.as_millis() as u64;
        let status = if response_time_ms > degraded_threshold_ms {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            response_time_ms,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Create an unhealthy result
    pub fn unhealthy(response_time: Duration, error: &str) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time_ms: response_time.as_millis() as u64,
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }

    /// Create an unhealthy result for a probe cut off after `timeout`
    pub fn timed_out(timeout: Duration) -> Self {
        Self::unhealthy(timeout, HEALTH_CHECK_TIMED_OUT)
    }

    /// Collapse into a store outcome; a degraded database still counts as up
    pub fn into_store_result(self, timeout: Duration) -> Result<()> {
        if self.status.is_operational() {
            return Ok(());
        }

        match self.error {
            Some(error) if error == HEALTH_CHECK_TIMED_OUT => Err(StoreError::TimeoutError {
                timeout_ms: timeout.as_millis() as u64,
                context: "Neo4j health check".to_string(),
            }),
            Some(error) => Err(StoreError::ConnectionError(error)),
            None => Err(StoreError::ConnectionError("Neo4j is unhealthy".to_string())),
        }
    }
}

/// Neo4j client with connection pooling
#[derive(Clone)]
pub struct Neo4jClient {
    graph: Graph,
    health_config: HealthCheckConfig,
}

impl Neo4jClient {
    /// Create a new Neo4j client with default configuration
    ///
    /// # Example
    /// ```no_run
    /// use tasker_core::Neo4jClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let client = Neo4jClient::new(
    ///         "bolt://localhost:7687",
    ///         "neo4j",
    ///         "password",
    ///         "neo4j"
    ///     ).await?;
    ///     client.ensure_schema().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(uri: &str, user: &str, password: &str, database: &str) -> Result<Self> {
        Self::with_config(uri, user, password, database, HealthCheckConfig::default()).await
    }

    /// Create a new Neo4j client with custom health check configuration
    pub async fn with_config(
        uri: &str,
        user: &str,
        password: &str,
        database: &str,
        health_config: HealthCheckConfig,
    ) -> Result<Self> {
        info!("Connecting to Neo4j at {} (database: {})", uri, database);

        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .db(database)
            .fetch_size(500)
            .max_connections(16)
            .build()
            .map_err(|e| StoreError::ConfigError(e.to_string()))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        info!("Successfully connected to Neo4j");

        Ok(Self {
            graph,
            health_config,
        })
    }

    /// Create the uniqueness constraints for task, user and sequence nodes
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA_CONSTRAINTS {
            debug!("Applying schema statement: {}", statement);
            self.graph
                .run(query(statement))
                .await
                .map_err(|e| StoreError::QueryError(format!("Failed to apply schema: {}", e)))?;
        }
        info!("Neo4j schema constraints in place");
        Ok(())
    }

    /// Simple health check using `RETURN 1`
    pub async fn health_check(&self) -> Result<bool> {
        debug!("Executing simple health check (RETURN 1)");

        self.graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        debug!("Simple health check passed");
        Ok(true)
    }

    /// Timed health check that never fails; errors and timeouts become
    /// an `Unhealthy` result
    pub async fn health_check_detailed(&self) -> HealthCheckResult {
        let start = Instant::now();

        match tokio::time::timeout(self.health_config.timeout, self.health_check()).await {
            Ok(Ok(_)) => HealthCheckResult::responsive(
                start.elapsed(),
                self.health_config.degraded_threshold_ms,
            ),
            Ok(Err(e)) => {
                error!("Health check query failed: {}", e);
                HealthCheckResult::unhealthy(start.elapsed(), &e.to_string())
            }
            Err(_) => {
                error!(
                    "Health check timed out after {:?}",
                    self.health_config.timeout
                );
                HealthCheckResult::timed_out(self.health_config.timeout)
            }
        }
    }

    /// Bounded liveness probe for `/health` and `tasker check`
    pub async fn ping(&self) -> Result<()> {
        self.health_check_detailed()
            .await
            .into_store_result(self.health_config.timeout)
    }

    /// Get a reference to the underlying Neo4j Graph instance
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Get the current health check configuration
    pub fn health_config(&self) -> &HealthCheckConfig {
        &self.health_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_http_codes() {
        assert_eq!(HealthStatus::Healthy.to_http_status_code(), 200);
        assert_eq!(HealthStatus::Degraded.to_http_status_code(), 200);
        assert_eq!(HealthStatus::Unhealthy.to_http_status_code(), 503);
    }

    #[test]
    fn test_health_status_operational() {
        assert!(HealthStatus::Healthy.is_operational());
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Unhealthy.is_operational());
    }

    #[test]
    fn test_health_check_result_healthy() {
        let result = HealthCheckResult::responsive(Duration::from_millis(50), 1000);

        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.response_time_ms, 50);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_health_check_result_degraded() {
        let result = HealthCheckResult::responsive(Duration::from_millis(1500), 1000);

        assert_eq!(result.status, HealthStatus::Degraded);
        assert_eq!(result.response_time_ms, 1500);
    }

    #[test]
    fn test_health_check_result_unhealthy() {
        let result = HealthCheckResult::unhealthy(Duration::from_millis(100), "Connection failed");

        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.error.as_deref(), Some("Connection failed"));
    }

    #[test]
    fn test_operational_results_map_to_ok() {
        let timeout = Duration::from_secs(5);

        assert!(HealthCheckResult::responsive(Duration::from_millis(5), 1000)
            .into_store_result(timeout)
            .is_ok());
        assert!(HealthCheckResult::responsive(Duration::from_millis(1500), 1000)
            .into_store_result(timeout)
            .is_ok());
    }

    #[test]
    fn test_timed_out_result_maps_to_timeout_error() {
        let timeout = Duration::from_secs(5);
        let result = HealthCheckResult::timed_out(timeout);

        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.response_time_ms, 5000);
        assert_eq!(
            result.into_store_result(timeout),
            Err(StoreError::TimeoutError {
                timeout_ms: 5000,
                context: "Neo4j health check".to_string(),
            })
        );
    }

    #[test]
    fn test_failed_result_maps_to_connection_error() {
        let result = HealthCheckResult::unhealthy(Duration::from_millis(3), "Connection refused");

        assert_eq!(
            result.into_store_result(Duration::from_secs(5)),
            Err(StoreError::ConnectionError("Connection refused".to_string()))
        );
    }

    #[test]
    fn test_schema_constraints_are_idempotent() {
        assert!(SCHEMA_CONSTRAINTS
            .iter()
            .all(|statement| statement.contains("IF NOT EXISTS")));
    }
}
