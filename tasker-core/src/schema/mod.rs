//! Record schema
//!
//! Model types for tasks and users, and the Cypher CRUD used by the Neo4j
//! store. Tasks and users are `:Task` / `:User` nodes; numeric ids come from
//! `:Sequence` counter nodes.

pub mod task;
pub mod types;
pub mod user;

pub use task::{create_task, delete_task, get_task, list_tasks_by_owner, update_task};
pub use types::{NewTask, NewUser, Task, TaskId, TaskStatus, TaskUpdate, User, UserId};
pub use user::{create_user, get_user, get_user_by_email};
