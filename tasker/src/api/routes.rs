//! API routes for the Tasker server

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRef, Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tasker_core::schema::{NewTask, Task, TaskId, TaskStatus, TaskUpdate, User};
use tasker_core::{HealthStatus, TaskService, TaskStore, UserService};
use tracing::warn;

use super::error::ApiError;
use super::middleware::{AuthState, AuthUser};

/// Application state
pub struct AppState {
    pub tasks: TaskService,
    pub users: UserService,
    pub auth: AuthState,
    /// Probed by the health check
    pub store: Arc<dyn TaskStore>,
}

impl FromRef<Arc<AppState>> for AuthState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

/// Health check response
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub store: String,
    pub cache: String,
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_hours: i64,
}

#[derive(Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Partial update; absent fields are left unchanged
#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `pending` or `done`
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TaskResponse {
    pub id: TaskId,
    pub title: String,
    pub content: String,
    pub status: TaskStatus,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            content: task.content,
            status: task.status,
        }
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|e| {
        warn!("Rejected request body: {}", e);
        ApiError::BadRequest("invalid request".to_string())
    })
}

fn task_id(path: Result<Path<TaskId>, PathRejection>) -> Result<TaskId, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("invalid task ID".to_string()))
}

/// Health check endpoint
///
/// The store must answer; a cache outage only degrades the service.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_up = state.store.ping().await.is_ok();

    let cache = match state.tasks.cache() {
        None => "disabled",
        Some(cache) => match cache.ping().await {
            Ok(()) => "up",
            Err(e) => {
                warn!("Cache health check failed on {}: {}", cache.backend(), e);
                "down"
            }
        },
    };

    let status = match (store_up, cache) {
        (false, _) => HealthStatus::Unhealthy,
        (true, "down") => HealthStatus::Degraded,
        (true, _) => HealthStatus::Healthy,
    };
    let code = StatusCode::from_u16(status.to_http_status_code())
        .unwrap_or(StatusCode::SERVICE_UNAVAILABLE);

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: if store_up { "up" } else { "down" }.to_string(),
            cache: cache.to_string(),
        }),
    )
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let user = state.users.register(&request.email, &request.password).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = json_body(payload)?;
    let user = state
        .users
        .authenticate(&request.email, &request.password)
        .await?;

    let expires_in_hours = state.auth.token_ttl_hours;
    let token = state
        .auth
        .jwt_auth
        .generate_token(user.id, expires_in_hours)?;

    Ok(Json(LoginResponse {
        token,
        expires_in_hours,
    }))
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.profile(user.id).await?;
    Ok(Json(user.into()))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let tasks = state.tasks.list_for_owner(user.id).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let task = state
        .tasks
        .create_task(NewTask::new(user.id, request.title, request.content))
        .await?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<TaskId>, PathRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.tasks.get_task(user.id, task_id(path)?).await?;
    Ok(Json(task.into()))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<TaskId>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let id = task_id(path)?;
    let request = json_body(payload)?;

    let status = request
        .status
        .as_deref()
        .map(|s| {
            TaskStatus::from_str(s)
                .ok_or_else(|| ApiError::BadRequest("invalid status".to_string()))
        })
        .transpose()?;

    let update = TaskUpdate {
        title: request.title,
        content: request.content,
        status,
    };
    let task = state.tasks.update_task(user.id, id, update).await?;
    Ok(Json(task.into()))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<TaskId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    state.tasks.delete_task(user.id, task_id(path)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_response_shape() {
        let now = Utc::now();
        let response = TaskResponse::from(Task {
            id: 3,
            user_id: 1,
            title: "Write report".to_string(),
            content: String::new(),
            status: TaskStatus::Done,
            created_at: now,
            updated_at: now,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 3, "title": "Write report", "content": "", "status": "done"})
        );
    }
}
