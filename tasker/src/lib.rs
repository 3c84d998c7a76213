//! Multi-tenant task-tracking HTTP API
//!
//! Task listings are served through a read-through cache from
//! [`tasker_core::TaskService`]; this crate wires it to configuration,
//! authentication and the HTTP surface.

pub mod api;
pub mod config;

pub use api::{ApiError, ApiServer, AuthState, JwtAuth};
pub use config::{AppConfig, CacheBackend, StoreBackend};
