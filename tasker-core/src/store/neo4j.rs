//! Neo4j-backed store

use super::{StoreResult, TaskStore, UserStore};
use crate::connection::Neo4jClient;
use crate::schema::{self, NewTask, NewUser, Task, TaskId, User, UserId};
use async_trait::async_trait;
use tracing::debug;

/// [`TaskStore`] and [`UserStore`] over a [`Neo4jClient`]
#[derive(Clone)]
pub struct Neo4jStore {
    client: Neo4jClient,
}

impl Neo4jStore {
    pub fn new(client: Neo4jClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Neo4jClient {
        &self.client
    }
}

#[async_trait]
impl TaskStore for Neo4jStore {
    async fn find_tasks_by_owner(&self, owner: UserId) -> StoreResult<Vec<Task>> {
        let tasks = schema::list_tasks_by_owner(self.client.graph(), owner).await?;
        debug!("Loaded {} tasks for user {} from Neo4j", tasks.len(), owner);
        Ok(tasks)
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        schema::get_task(self.client.graph(), id).await
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        schema::create_task(self.client.graph(), &task).await
    }

    async fn update_task(&self, task: &Task) -> StoreResult<bool> {
        schema::update_task(self.client.graph(), task).await
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<bool> {
        schema::delete_task(self.client.graph(), id).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client.ping().await
    }
}

#[async_trait]
impl UserStore for Neo4jStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        schema::create_user(self.client.graph(), &user).await
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        schema::get_user(self.client.graph(), id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        schema::get_user_by_email(self.client.graph(), email).await
    }
}
