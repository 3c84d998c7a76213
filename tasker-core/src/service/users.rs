//! Registration, login and profile lookups

use crate::error::{Result, StoreError, TaskerError};
use crate::schema::{NewUser, User, UserId};
use crate::store::UserStore;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

pub const MIN_PASSWORD_LEN: usize = 8;

pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Create an account; the password is stored as an Argon2id hash
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(TaskerError::Validation("invalid email".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(TaskerError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(email_taken());
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::UniqueViolation(_) => email_taken(),
                other => TaskerError::Origin(other),
            })?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Check an email/password pair
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let Some(user) = self.store.find_user_by_email(email.trim()).await? else {
            debug!("Login attempt for unknown email");
            return Err(TaskerError::InvalidCredentials);
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;

        if !valid {
            debug!("Wrong password for user {}", user.id);
            return Err(TaskerError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn profile(&self, id: UserId) -> Result<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| TaskerError::user_not_found(id))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| TaskerError::Internal(format!("Failed to encode salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| TaskerError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

fn email_taken() -> TaskerError {
    TaskerError::Conflict("email already registered".to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
