//! Task operations and the cache-aside listing read path

use crate::cache::{task_list_key, CacheConfig, CacheStore, Jitter, RequestCollapser};
use crate::error::{Result, TaskerError};
use crate::schema::{NewTask, Task, TaskId, TaskUpdate, UserId};
use crate::store::TaskStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Task use cases with a read-through cache over the owner's listing
///
/// Reads of a listing go cache first. Concurrent misses for one owner are
/// collapsed into a single origin fetch, and every successful mutation
/// deletes the owner's cached listing.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    cache: Option<Arc<dyn CacheStore>>,
    config: CacheConfig,
    jitter: Arc<Jitter>,
    loads: RequestCollapser<Vec<Task>, TaskerError>,
}

impl TaskService {
    /// `cache: None` disables caching; every listing then goes to the store
    pub fn new(
        store: Arc<dyn TaskStore>,
        cache: Option<Arc<dyn CacheStore>>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
            jitter: Arc::new(Jitter::new()),
            loads: RequestCollapser::new(),
        }
    }

    /// Replace the TTL jitter source
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheStore>> {
        self.cache.as_ref()
    }

    /// Every task owned by `owner`, newest first
    pub async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Task>> {
        let Some(cache) = &self.cache else {
            return Ok(self.store.find_tasks_by_owner(owner).await?);
        };

        let key = task_list_key(owner);
        if let Some(tasks) = read_cached(cache.as_ref(), &key).await {
            return Ok(tasks);
        }

        let store = Arc::clone(&self.store);
        let cache = Arc::clone(cache);
        let ttl = self.config.task_list_ttl_with_jitter(&self.jitter);
        let load_key = key.clone();

        self.loads
            .collapse(&key, move || async move {
                // Another burst may have filled the entry since our miss
                if let Some(tasks) = read_cached(cache.as_ref(), &load_key).await {
                    return Ok(tasks);
                }

                let tasks = store.find_tasks_by_owner(owner).await?;
                write_cached(cache.as_ref(), &load_key, &tasks, ttl).await;
                Ok(tasks)
            })
            .await
    }

    /// One task, visible only to its owner
    pub async fn get_task(&self, user: UserId, id: TaskId) -> Result<Task> {
        let task = self
            .store
            .find_task(id)
            .await?
            .ok_or_else(|| TaskerError::task_not_found(id))?;

        if !task.is_owned_by(user) {
            return Err(TaskerError::PermissionDenied);
        }
        Ok(task)
    }

    pub async fn create_task(&self, task: NewTask) -> Result<Task> {
        validate_title(&task.title)?;

        let owner = task.user_id;
        let created = self.store.create_task(task).await?;
        debug!("Created task {} for user {}", created.id, owner);

        self.invalidate(owner).await;
        Ok(created)
    }

    /// Apply `update` to a task owned by `user`
    pub async fn update_task(&self, user: UserId, id: TaskId, update: TaskUpdate) -> Result<Task> {
        let mut task = self.get_task(user, id).await?;

        update.apply_to(&mut task);
        validate_title(&task.title)?;
        task.updated_at = Utc::now();

        if !self.store.update_task(&task).await? {
            return Err(TaskerError::task_not_found(id));
        }

        self.invalidate(task.user_id).await;
        Ok(task)
    }

    /// Delete a task owned by `user`
    pub async fn delete_task(&self, user: UserId, id: TaskId) -> Result<()> {
        let task = self.get_task(user, id).await?;

        if !self.store.delete_task(id).await? {
            return Err(TaskerError::task_not_found(id));
        }

        self.invalidate(task.user_id).await;
        Ok(())
    }

    /// Drop the cached listing of `owner`
    ///
    /// Never fails: without a cache this is a no-op, and a cache error is
    /// logged. The entry then lives until its TTL runs out.
    pub async fn invalidate(&self, owner: UserId) {
        let Some(cache) = &self.cache else {
            return;
        };

        let key = task_list_key(owner);
        match cache.delete(&key).await {
            Ok(()) => debug!("Invalidated {}", key),
            Err(e) => warn!("Failed to invalidate {} on {}: {}", key, cache.backend(), e),
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TaskerError::Validation("title is required".to_string()));
    }
    Ok(())
}

/// Cached listing under `key`; unreadable and undecodable entries count as misses
async fn read_cached(cache: &dyn CacheStore, key: &str) -> Option<Vec<Task>> {
    let bytes = match cache.get(key).await {
        Ok(Some(bytes)) if !bytes.is_empty() => bytes,
        Ok(_) => {
            debug!("Cache miss: {}", key);
            return None;
        }
        Err(e) => {
            warn!("Cache read failed for {} on {}: {}", key, cache.backend(), e);
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(tasks) => {
            debug!("Cache hit: {}", key);
            Some(tasks)
        }
        Err(e) => {
            warn!("Discarding undecodable cache entry {}: {}", key, e);
            None
        }
    }
}

async fn write_cached(cache: &dyn CacheStore, key: &str, tasks: &[Task], ttl: Duration) {
    let bytes = match serde_json::to_vec(tasks) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to encode task listing for {}: {}", key, e);
            return;
        }
    };

    match cache.set(key, bytes, ttl).await {
        Ok(()) => debug!("Cached {} tasks under {} for {:?}", tasks.len(), key, ttl),
        Err(e) => warn!("Cache write failed for {} on {}: {}", key, cache.backend(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::schema::TaskStatus;
    use crate::store::MemoryStore;

    fn service_with_cache() -> (TaskService, Arc<MemoryStore>, Arc<MemoryCache>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new(CacheConfig::default()));
        let service = TaskService::new(
            store.clone(),
            Some(cache.clone() as Arc<dyn CacheStore>),
            CacheConfig::default(),
        );
        (service, store, cache)
    }

    #[tokio::test]
    async fn test_listing_without_cache_reads_store() {
        let store = Arc::new(MemoryStore::new());
        let service = TaskService::new(store.clone(), None, CacheConfig::default());

        service
            .create_task(NewTask::new(1, "Buy milk", ""))
            .await
            .unwrap();

        let tasks = service.list_for_owner(1).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(service.cache().is_none());
    }

    #[tokio::test]
    async fn test_listing_populates_cache() {
        let (service, store, cache) = service_with_cache();
        store.create_task(NewTask::new(1, "Buy milk", "")).await.unwrap();

        let tasks = service.list_for_owner(1).await.unwrap();

        let cached = cache.get(&task_list_key(1)).await.unwrap().unwrap();
        let decoded: Vec<Task> = serde_json::from_slice(&cached).unwrap();
        assert_eq!(decoded, tasks);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let (service, _, _) = service_with_cache();

        let err = service
            .create_task(NewTask::new(1, "   ", ""))
            .await
            .unwrap_err();
        assert_eq!(err, TaskerError::Validation("title is required".to_string()));
    }

    #[tokio::test]
    async fn test_update_patches_and_checks_owner() {
        let (service, _, _) = service_with_cache();
        let task = service
            .create_task(NewTask::new(1, "Write report", ""))
            .await
            .unwrap();

        let updated = service
            .update_task(
                1,
                task.id,
                TaskUpdate {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.title, "Write report");
        assert!(updated.updated_at >= task.updated_at);

        let err = service
            .update_task(2, task.id, TaskUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err, TaskerError::PermissionDenied);

        let err = service
            .update_task(
                1,
                task.id,
                TaskUpdate {
                    title: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let (service, _, _) = service_with_cache();

        assert_eq!(
            service.get_task(1, 404).await.unwrap_err(),
            TaskerError::task_not_found(404)
        );
        assert_eq!(
            service.delete_task(1, 404).await.unwrap_err(),
            TaskerError::task_not_found(404)
        );
    }

    #[tokio::test]
    async fn test_invalidate_without_cache_is_noop() {
        let service = TaskService::new(Arc::new(MemoryStore::new()), None, CacheConfig::default());
        service.invalidate(1).await;
    }
}
