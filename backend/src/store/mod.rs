//! Task persistence.
//!
//! Handlers only see [`TaskStore`]; the Redis document store backs the real
//! server and [`InMemoryTaskStore`] backs tests.

use async_trait::async_trait;
use shared::{validate_title, CreateTaskRequest, Task, UpdateTaskRequest};
use uuid::Uuid;

use crate::error::StoreError;

mod memory;
mod redis_store;

pub use self::memory::InMemoryTaskStore;
pub use self::redis_store::RedisTaskStore;

pub const TASK_NOT_FOUND: &str = "task not found";

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks, newest first.
    async fn list_all(&self) -> Result<Vec<Task>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Task, StoreError>;

    /// Persist a new task. The store assigns `id` and `createdAt`.
    async fn create(&self, fields: CreateTaskRequest) -> Result<Task, StoreError>;

    /// Merge the supplied fields into an existing task and return the result.
    async fn update_by_id(&self, id: &str, patch: UpdateTaskRequest) -> Result<Task, StoreError>;

    /// Remove a task, returning its last state.
    async fn delete_by_id(&self, id: &str) -> Result<Task, StoreError>;
}

/// Validate creation fields and build the task to persist.
pub(crate) fn new_task(fields: CreateTaskRequest) -> Result<Task, StoreError> {
    let title = fields.title.unwrap_or_default();
    validate_title(&title).map_err(StoreError::Validation)?;
    Ok(Task::new(title, fields.completed.unwrap_or(false)))
}

/// Ids are UUIDs; anything else cannot name a stored task.
pub(crate) fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::NotFound(TASK_NOT_FOUND.to_string()))
}

pub(crate) fn not_found() -> StoreError {
    StoreError::NotFound(TASK_NOT_FOUND.to_string())
}

/// Stable sort, newest first. Callers pass tasks in reverse insertion order
/// so equal timestamps keep the later insertion in front.
pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
