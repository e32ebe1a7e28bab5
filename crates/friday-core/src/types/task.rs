//! Bookkeeping record for one handled request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Lifecycle of a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One request as seen by the dispatcher: the command, its payload and how it
/// ended. At most one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub cmd: String,
    pub payload: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A pending task stamped with the current time.
    pub fn new(id: Uuid, cmd: impl Into<String>, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            status: TaskStatus::Pending,
            cmd: cmd.into(),
            payload,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn start(&mut self) {
        self.set_status(TaskStatus::Running);
    }

    pub fn complete(&mut self, result: Value) {
        self.result = Some(result);
        self.error = None;
        self.set_status(TaskStatus::Completed);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.result = None;
        self.error = Some(error.into());
        self.set_status(TaskStatus::Failed);
    }

    /// Completed or failed.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }

    fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
