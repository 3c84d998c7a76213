//! HTTP API for Tasker

pub mod auth;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

pub use auth::JwtAuth;
pub use error::ApiError;
pub use middleware::{AuthState, AuthUser};
pub use server::{router, ApiServer, Backends};
