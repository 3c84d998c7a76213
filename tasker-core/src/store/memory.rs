//! In-process store for development and tests

use super::{StoreResult, TaskStore, UserStore};
use crate::error::StoreError;
use crate::schema::{NewTask, NewUser, Task, TaskId, User, UserId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    tasks: HashMap<TaskId, Task>,
    users: HashMap<UserId, User>,
    next_task_id: TaskId,
    next_user_id: UserId,
}

/// [`TaskStore`] and [`UserStore`] kept in memory
///
/// Ids start at 1 and are never reused. Emails are unique, like the Neo4j
/// constraint.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert fully formed tasks as-is, keeping their ids
    pub async fn seed_tasks(&self, tasks: impl IntoIterator<Item = Task>) {
        let mut tables = self.tables.write().await;
        for task in tasks {
            tables.next_task_id = tables.next_task_id.max(task.id);
            tables.tasks.insert(task.id, task);
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_tasks_by_owner(&self, owner: UserId) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|task| task.is_owned_by(owner))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.next_task_id += 1;

        let now = Utc::now();
        let task = Task {
            id: tables.next_task_id,
            user_id: task.user_id,
            title: task.title,
            content: task.content,
            status: task.status,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&task.id) {
            Some(stored) => {
                stored.title = task.title.clone();
                stored.content = task.content.clone();
                stored.status = task.status;
                stored.updated_at = task.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<bool> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(format!(
                "email {} is already registered",
                user.email
            )));
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TaskStatus;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = MemoryStore::new();

        let a = store.create_task(NewTask::new(1, "a", "")).await.unwrap();
        let b = store.create_task(NewTask::new(1, "b", "")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[tokio::test]
    async fn test_listing_is_scoped_and_newest_first() {
        let store = MemoryStore::new();

        store.create_task(NewTask::new(1, "first", "")).await.unwrap();
        store.create_task(NewTask::new(2, "other", "")).await.unwrap();
        store.create_task(NewTask::new(1, "second", "")).await.unwrap();

        let titles: Vec<String> = store
            .find_tasks_by_owner(1)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert!(store.find_tasks_by_owner(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_report_missing() {
        let store = MemoryStore::new();
        let mut task = store.create_task(NewTask::new(1, "a", "")).await.unwrap();

        task.status = TaskStatus::Done;
        assert!(store.update_task(&task).await.unwrap());
        assert_eq!(
            store.find_task(task.id).await.unwrap().unwrap().status,
            TaskStatus::Done
        );

        assert!(store.delete_task(task.id).await.unwrap());
        assert!(!store.delete_task(task.id).await.unwrap());
        assert!(!store.update_task(&task).await.unwrap());
    }

    #[tokio::test]
    async fn test_seeded_ids_are_not_reused() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .seed_tasks([Task {
                id: 456,
                user_id: 99,
                title: "seeded".to_string(),
                content: String::new(),
                status: TaskStatus::Pending,
                created_at: now,
                updated_at: now,
            }])
            .await;

        let created = store.create_task(NewTask::new(1, "new", "")).await.unwrap();
        assert_eq!(created.id, 457);
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let store = MemoryStore::new();
        let new_user = NewUser {
            email: "a@example.com".to_string(),
            password_hash: "hash".to_string(),
        };

        let user = store.create_user(new_user.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(new_user).await,
            Err(StoreError::UniqueViolation(_))
        ));

        assert_eq!(store.find_user(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(
            store.find_user_by_email("a@example.com").await.unwrap(),
            Some(user)
        );
        assert!(store.find_user_by_email("b@example.com").await.unwrap().is_none());
    }
}
