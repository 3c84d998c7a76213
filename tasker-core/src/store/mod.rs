//! Persistent store seam
//!
//! [`TaskStore`] and [`UserStore`] are the origin behind the listing cache.
//! [`Neo4jStore`] is the production backend; [`MemoryStore`] keeps everything
//! in process for development and tests.

use crate::error::StoreError;
use crate::schema::{NewTask, NewUser, Task, TaskId, User, UserId};
use async_trait::async_trait;

pub mod memory;
pub mod neo4j;

pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Task persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every task owned by `owner`, newest first
    async fn find_tasks_by_owner(&self, owner: UserId) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Store a new task; the store assigns id and timestamps
    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;

    /// Overwrite title, content, status and `updated_at`; `false` if the task is gone
    async fn update_task(&self, task: &Task) -> StoreResult<bool>;

    /// `false` if there was nothing to delete
    async fn delete_task(&self, id: TaskId) -> StoreResult<bool>;

    /// Verify the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Store a new user; the store assigns id and `created_at`
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}
