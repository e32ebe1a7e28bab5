//! Task bookkeeping interface.

use crate::error::SidecarResult;
use crate::types::Task;

/// One row per handled request, keyed by task id.
pub trait TaskStore: Send + Sync {
    /// Insert a new task. Fails if the id already exists.
    fn create_task(&self, task: &Task) -> SidecarResult<()>;

    /// Store the task's current status, result and error. Returns `false` if
    /// the id is unknown.
    fn update_task(&self, task: &Task) -> SidecarResult<bool>;

    fn get_task(&self, id: &str) -> SidecarResult<Option<Task>>;

    /// Most recent tasks first.
    fn list_tasks(&self, limit: usize) -> SidecarResult<Vec<Task>>;
}
