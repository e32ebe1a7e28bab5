//! Core types for the sidecar.

mod intent;
mod resource;
mod task;

pub use intent::{Intent, IntentKind};
pub use resource::{Resource, ResourceType};
pub use task::{Task, TaskStatus};
