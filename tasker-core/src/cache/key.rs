//! Cache key derivation
//!
//! Keys follow `<entity-namespace>:<ownerID>:<collection-name>:<schema-version>`.
//! Bump [`TASK_LIST_VERSION`] whenever the serialized shape of
//! [`Task`](crate::schema::Task) changes so old entries are never decoded.

use crate::schema::UserId;

pub const USER_NAMESPACE: &str = "user";
pub const TASK_LIST_COLLECTION: &str = "tasks";
pub const TASK_LIST_VERSION: &str = "v1";

/// Key under which the task listing of `owner` is cached
pub fn task_list_key(owner: UserId) -> String {
    format!(
        "{}:{}:{}:{}",
        USER_NAMESPACE, owner, TASK_LIST_COLLECTION, TASK_LIST_VERSION
    )
}
