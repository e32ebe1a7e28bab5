//! Per-process sidecar context.
//!
//! Built once in `main` and handed to every component. Holds everything that
//! would otherwise be process-wide state: configuration, the resolved library
//! root, the progress sink and the optional resource and task stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::SidecarConfig;
use crate::error::SidecarResult;
use crate::progress::{ProgressSink, StderrProgress};
use crate::store::SqliteStore;
use crate::traits::{ResourceStore, TaskStore};

/// Shared context for one sidecar invocation.
#[derive(Clone)]
pub struct SidecarContext {
    config: SidecarConfig,
    library_root: PathBuf,
    progress: Arc<dyn ProgressSink>,
    store: Option<Arc<dyn ResourceStore>>,
    tasks: Option<Arc<dyn TaskStore>>,
}

impl SidecarContext {
    /// Build a context from configuration.
    ///
    /// Progress goes to stderr. When `database_path` is configured, one
    /// SQLite file backs both the resource and the task store.
    pub fn new(config: SidecarConfig) -> SidecarResult<Self> {
        let library_root = config.library_root()?;
        let (store, tasks) = match &config.database_path {
            Some(path) => {
                info!("Database: {}", path.display());
                let db = Arc::new(SqliteStore::new(path)?);
                let store: Arc<dyn ResourceStore> = db.clone();
                let tasks: Arc<dyn TaskStore> = db;
                (Some(store), Some(tasks))
            }
            None => (None, None),
        };

        Ok(Self {
            config,
            library_root,
            progress: Arc::new(StderrProgress),
            store,
            tasks,
        })
    }

    /// Replace the progress sink.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Replace the resource store.
    pub fn with_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the task store.
    pub fn with_task_store(mut self, tasks: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn config(&self) -> &SidecarConfig {
        &self.config
    }

    /// Absolute library root.
    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    pub fn progress(&self) -> &Arc<dyn ProgressSink> {
        &self.progress
    }

    pub fn store(&self) -> Option<&Arc<dyn ResourceStore>> {
        self.store.as_ref()
    }

    pub fn task_store(&self) -> Option<&Arc<dyn TaskStore>> {
        self.tasks.as_ref()
    }
}
