//! friday-core - Core library for the Friday sidecar.
//!
//! This crate provides the resource model, error taxonomy, configuration,
//! progress side channel, task bookkeeping and collaborator traits shared by the ingestion
//! pipelines and the request dispatcher.

pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::SidecarConfig;
pub use context::SidecarContext;
pub use error::{ErrorCode, SidecarError, SidecarResult};
pub use progress::{
    band_percent, MemoryProgress, ProgressEvent, ProgressSink, ProgressStage, StderrProgress,
};
pub use store::SqliteStore;
pub use traits::{IntentClassifier, ResourceStore, TaskStore};
pub use types::{Intent, IntentKind, Resource, ResourceType, Task, TaskStatus};
