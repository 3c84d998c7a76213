//! User node CRUD operations

use crate::error::StoreError;
use crate::schema::task::{field, from_bolt_id, parse_timestamp, timestamp, to_bolt_id};
use crate::schema::types::{NewUser, User, UserId};
use chrono::Utc;
use neo4rs::{query, Graph, Node, Row};

type Result<T> = std::result::Result<T, StoreError>;

/// Create a new User node, assigning the next id from the `user` sequence
pub async fn create_user(graph: &Graph, user: &NewUser) -> Result<User> {
    let cypher = query(
        "MERGE (seq:Sequence {name: 'user'})
         ON CREATE SET seq.value = 0
         SET seq.value = seq.value + 1
         WITH seq.value AS id
         CREATE (u:User {
            id: id,
            email: $email,
            password_hash: $password_hash,
            created_at: $created_at
         })
         RETURN u",
    )
    .param("email", user.email.clone())
    .param("password_hash", user.password_hash.clone())
    .param("created_at", timestamp(Utc::now()));

    // The unique email constraint may fire on execute or on the first pull
    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| create_user_error(&user.email, e))?;

    let row = result
        .next()
        .await
        .map_err(|e| create_user_error(&user.email, e))?;

    user_from_row(row)?
        .ok_or_else(|| StoreError::QueryError("User creation returned no node".to_string()))
}

/// Get a User node by id
pub async fn get_user(graph: &Graph, user_id: UserId) -> Result<Option<User>> {
    let cypher = query("MATCH (u:User {id: $id}) RETURN u").param("id", to_bolt_id(user_id)?);

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to get user: {}", e)))?;

    let row = result
        .next()
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to read user result: {}", e)))?;

    user_from_row(row)
}

/// Get a User node by email
pub async fn get_user_by_email(graph: &Graph, email: &str) -> Result<Option<User>> {
    let cypher = query("MATCH (u:User {email: $email}) RETURN u").param("email", email.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to get user by email: {}", e)))?;

    let row = result
        .next()
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to read user result: {}", e)))?;

    user_from_row(row)
}

/// Neo4j reports unique constraint hits as `ConstraintValidationFailed`
fn create_user_error(email: &str, error: neo4rs::Error) -> StoreError {
    let message = error.to_string();
    if is_constraint_violation(&message) {
        StoreError::UniqueViolation(format!("email {} is already registered", email))
    } else {
        StoreError::QueryError(format!("Failed to create user: {}", message))
    }
}

fn is_constraint_violation(message: &str) -> bool {
    message.contains("ConstraintValidationFailed") || message.contains("already exists with label")
}

fn user_from_row(row: Option<Row>) -> Result<Option<User>> {
    let Some(row) = row else {
        return Ok(None);
    };

    let node: Node = row
        .get("u")
        .map_err(|e| StoreError::CorruptRecord(format!("Failed to extract user node: {}", e)))?;

    let id: i64 = field(&node, "id")?;
    let email: String = field(&node, "email")?;
    let password_hash: String = field(&node, "password_hash")?;
    let created_at: String = field(&node, "created_at")?;

    Ok(Some(User {
        id: from_bolt_id(id)?,
        email,
        password_hash,
        created_at: parse_timestamp(&created_at)?,
    }))
}
