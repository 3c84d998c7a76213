//! Task node CRUD operations

use crate::error::StoreError;
use crate::schema::types::{NewTask, Task, TaskId, TaskStatus, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use neo4rs::{query, Graph, Node, Row};

type Result<T> = std::result::Result<T, StoreError>;

/// Create a new Task node, assigning the next id from the `task` sequence
///
/// # Example
/// ```no_run
/// use tasker_core::{Neo4jClient, schema::{NewTask, create_task}};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Neo4jClient::new(
///         "bolt://localhost:7687",
///         "neo4j",
///         "password",
///         "neo4j"
///     ).await?;
///
///     let task = create_task(client.graph(), &NewTask::new(1, "Buy milk", "")).await?;
///     println!("Created task {}", task.id);
///     Ok(())
/// }
/// ```
pub async fn create_task(graph: &Graph, task: &NewTask) -> Result<Task> {
    let now = timestamp(Utc::now());
    let cypher = query(
        "MERGE (seq:Sequence {name: 'task'})
         ON CREATE SET seq.value = 0
         SET seq.value = seq.value + 1
         WITH seq.value AS id
         CREATE (t:Task {
            id: id,
            user_id: $user_id,
            title: $title,
            content: $content,
            status: $status,
            created_at: $now,
            updated_at: $now
         })
         RETURN t",
    )
    .param("user_id", to_bolt_id(task.user_id)?)
    .param("title", task.title.clone())
    .param("content", task.content.clone())
    .param("status", task.status.as_str())
    .param("now", now);

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to create task: {}", e)))?;

    let row = result
        .next()
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to read created task: {}", e)))?;

    match task_from_row(row)? {
        Some(task) => Ok(task),
        None => Err(StoreError::QueryError(
            "Task creation returned no node".to_string(),
        )),
    }
}

/// Get a Task node by id
///
/// # Returns
/// * `Ok(Some(Task))` if task exists
/// * `Ok(None)` if task not found
pub async fn get_task(graph: &Graph, task_id: TaskId) -> Result<Option<Task>> {
    let cypher = query("MATCH (t:Task {id: $id}) RETURN t").param("id", to_bolt_id(task_id)?);

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to get task: {}", e)))?;

    let row = result
        .next()
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to read task result: {}", e)))?;

    task_from_row(row)
}

/// List every task owned by `user_id`, newest first
pub async fn list_tasks_by_owner(graph: &Graph, user_id: UserId) -> Result<Vec<Task>> {
    let cypher = query(
        "MATCH (t:Task {user_id: $user_id})
         RETURN t
         ORDER BY t.created_at DESC, t.id DESC",
    )
    .param("user_id", to_bolt_id(user_id)?);

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to list tasks: {}", e)))?;

    let mut tasks = Vec::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to read task list: {}", e)))?
    {
        if let Some(task) = task_from_row(Some(row))? {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

/// Overwrite a Task node's editable fields
///
/// # Returns
/// * `Ok(true)` if task was found and updated
/// * `Ok(false)` if task was not found
pub async fn update_task(graph: &Graph, task: &Task) -> Result<bool> {
    let cypher = query(
        "MATCH (t:Task {id: $id})
         SET t.title = $title,
             t.content = $content,
             t.status = $status,
             t.updated_at = $updated_at
         RETURN t",
    )
    .param("id", to_bolt_id(task.id)?)
    .param("title", task.title.clone())
    .param("content", task.content.clone())
    .param("status", task.status.as_str())
    .param("updated_at", timestamp(task.updated_at));

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to update task: {}", e)))?;

    // Check if any row was returned (task was found and updated)
    let updated = result
        .next()
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to read update result: {}", e)))?
        .is_some();

    Ok(updated)
}

/// Delete a Task node
///
/// # Returns
/// * `Ok(true)` if task was found and deleted
/// * `Ok(false)` if task was not found
pub async fn delete_task(graph: &Graph, task_id: TaskId) -> Result<bool> {
    let cypher = query(
        "MATCH (t:Task {id: $id})
         WITH t, t.id AS id
         DETACH DELETE t
         RETURN id",
    )
    .param("id", to_bolt_id(task_id)?);

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to delete task: {}", e)))?;

    let deleted = result
        .next()
        .await
        .map_err(|e| StoreError::QueryError(format!("Failed to read delete result: {}", e)))?
        .is_some();

    Ok(deleted)
}

fn task_from_row(row: Option<Row>) -> Result<Option<Task>> {
    let Some(row) = row else {
        return Ok(None);
    };

    let node: Node = row
        .get("t")
        .map_err(|e| StoreError::CorruptRecord(format!("Failed to extract task node: {}", e)))?;

    task_from_node(&node).map(Some)
}

fn task_from_node(node: &Node) -> Result<Task> {
    let id: i64 = field(node, "id")?;
    let user_id: i64 = field(node, "user_id")?;
    let title: String = field(node, "title")?;
    let content: String = field(node, "content")?;

    let status_str: String = field(node, "status")?;
    let status = TaskStatus::from_str(&status_str)
        .ok_or_else(|| StoreError::CorruptRecord(format!("Invalid task status: {}", status_str)))?;

    let created_at: String = field(node, "created_at")?;
    let updated_at: String = field(node, "updated_at")?;

    Ok(Task {
        id: from_bolt_id(id)?,
        user_id: from_bolt_id(user_id)?,
        title,
        content,
        status,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

pub(crate) fn field<T>(node: &Node, name: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    node.get(name)
        .map_err(|e| StoreError::CorruptRecord(format!("Failed to extract {}: {}", name, e)))
}

/// Fixed-width RFC 3339 so lexical order in Cypher matches time order
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRecord(format!("Failed to parse datetime {}: {}", value, e)))
}

pub(crate) fn to_bolt_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| StoreError::QueryError(format!("Id out of range: {}", id)))
}

pub(crate) fn from_bolt_id(id: i64) -> Result<u64> {
    u64::try_from(id).map_err(|_| StoreError::CorruptRecord(format!("Negative id: {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_row_is_none() {
        assert!(task_from_row(None).unwrap().is_none());
    }

    #[test]
    fn test_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::nanoseconds(1_500);

        assert_eq!(timestamp(a).len(), timestamp(b).len());
        assert!(timestamp(a) < timestamp(b));
        assert!(timestamp(a).ends_with('Z'));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let at = Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(parse_timestamp(&timestamp(at)).unwrap(), at);
    }

    #[test]
    fn test_bolt_id_conversion() {
        assert_eq!(to_bolt_id(42).unwrap(), 42);
        assert!(to_bolt_id(u64::MAX).is_err());
        assert!(from_bolt_id(-1).is_err());
    }
}
