//! Use cases called by request handlers

pub mod tasks;
pub mod users;

pub use tasks::TaskService;
pub use users::{UserService, MIN_PASSWORD_LEN};
