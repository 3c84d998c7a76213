//! Runtime configuration from flags, environment and `.env`

use anyhow::{anyhow, bail, Result};
use clap::{Parser, ValueEnum};
use fundu::{DurationParser, TimeUnit};
use std::time::Duration;
use tasker_core::cache::CacheConfig;
use tasker_core::RedisCache;

/// Where tasks and users are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Memory,
    Neo4j,
}

/// Which cache sits in front of task listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    Redis,
    Memory,
    None,
}

/// Server configuration
///
/// Every flag falls back to the environment variable of the same meaning.
#[derive(Debug, Clone, Parser)]
pub struct AppConfig {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// HMAC secret for signing access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in hours
    #[arg(long, env = "TOKEN_TTL_HOURS", default_value_t = 1)]
    pub token_ttl_hours: i64,

    /// Persistent store backend
    #[arg(long = "store", env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Memory)]
    pub store: StoreBackend,

    #[arg(long, env = "NEO4J_URI", default_value = "bolt://localhost:7687")]
    pub neo4j_uri: String,

    #[arg(long, env = "NEO4J_USER", default_value = "neo4j")]
    pub neo4j_user: String,

    #[arg(long, env = "NEO4J_PASSWORD", default_value = "", hide_env_values = true)]
    pub neo4j_password: String,

    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j")]
    pub neo4j_database: String,

    /// Task listing cache backend
    #[arg(long = "cache", env = "CACHE_BACKEND", value_enum, default_value_t = CacheBackend::Redis)]
    pub cache: CacheBackend,

    /// Redis `host:port`; empty disables caching
    #[arg(long, env = "REDIS_ADDR", default_value = "localhost:6379")]
    pub redis_addr: String,

    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    #[arg(long, env = "REDIS_DB", default_value_t = 0)]
    pub redis_db: i64,

    /// Base TTL of a cached task listing, e.g. `60s` or `5m`
    #[arg(long, env = "CACHE_TTL_TASKS", default_value = "60s", value_parser = parse_duration)]
    pub cache_ttl_tasks: Duration,

    /// Upper bound on a single Redis round trip
    #[arg(long, env = "CACHE_OP_TIMEOUT", default_value = "250ms", value_parser = parse_duration)]
    pub cache_op_timeout: Duration,

    /// Sweep expired entries of the in-memory cache in the background
    #[arg(long, env = "CACHE_AUTO_CLEANUP", default_value_t = true, action = clap::ArgAction::Set)]
    pub cache_auto_cleanup: bool,

    /// Deadline for a whole HTTP request
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "10s", value_parser = parse_duration)]
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Fail fast on settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        self.jwt_secret()?;

        if self.token_ttl_hours <= 0 {
            bail!("TOKEN_TTL_HOURS must be greater than 0");
        }
        if self.request_timeout.is_zero() {
            bail!("REQUEST_TIMEOUT must be greater than 0");
        }

        self.cache_config().validate().map_err(|e| anyhow!(e))?;
        Ok(())
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => bail!("JWT_SECRET is required (set the env var or pass --jwt-secret)"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::builder()
            .task_list_ttl(self.cache_ttl_tasks)
            .op_timeout(self.cache_op_timeout)
            .enable_auto_cleanup(self.cache_auto_cleanup)
            .build()
    }

    /// Redis URL, or `None` when no address is configured
    pub fn redis_url(&self) -> Option<String> {
        let addr = self.redis_addr.trim();
        if addr.is_empty() {
            return None;
        }
        Some(RedisCache::connection_url(
            addr,
            self.redis_password.as_deref(),
            self.redis_db,
        ))
    }
}

/// Parse human durations such as `250ms`, `60s`, `5m` or `1h`
pub fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);

    let duration = parser
        .parse(value.trim())
        .map_err(|e| format!("invalid duration '{}': {}", value, e))?;

    Duration::try_from(duration).map_err(|e| format!("invalid duration '{}': {}", value, e))
}
