//! Authentication middleware for Axum

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tasker_core::schema::UserId;
use tracing::debug;

use super::auth::JwtAuth;
use super::error::ApiError;

/// Authentication state shared across requests
#[derive(Clone)]
pub struct AuthState {
    pub jwt_auth: Arc<JwtAuth>,
    pub token_ttl_hours: i64,
}

impl AuthState {
    pub fn new(secret: &str, token_ttl_hours: i64) -> Self {
        Self {
            jwt_auth: Arc::new(JwtAuth::new(secret)),
            token_ttl_hours,
        }
    }
}

/// Authenticated caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
}

/// Reject requests without a valid bearer token
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = JwtAuth::extract_bearer_token(auth_header).map_err(|_| ApiError::Unauthorized)?;

    let user_id = state
        .jwt_auth
        .validate_token(token)
        .and_then(|claims| claims.user_id())
        .map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::Unauthorized
        })?;

    request.extensions_mut().insert(AuthUser { id: user_id });

    Ok(next.run(request).await)
}
