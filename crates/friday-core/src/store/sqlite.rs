//! SQLite-backed store for resources and tasks.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{SidecarError, SidecarResult};
use crate::traits::ResourceStore;
use crate::types::{Resource, ResourceType};

type ResourceRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
);

/// SQLite database holding the `resources` and `tasks` tables
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    pub fn new(path: impl AsRef<Path>) -> SidecarResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!(path = %path.as_ref().display(), "Opened store");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> SidecarResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub(super) fn lock(&self) -> SidecarResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SidecarError::Internal("store lock poisoned".to_string()))
    }

    fn init_schema(&self) -> SidecarResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS resources (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                title TEXT NOT NULL,
                source TEXT NOT NULL,
                md_path TEXT,
                assets TEXT NOT NULL DEFAULT '[]',
                vector_index TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_resources_type ON resources(type);

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                cmd TEXT NOT NULL,
                payload TEXT NOT NULL,
                result TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        "#,
        )?;
        Ok(())
    }

    pub(super) fn parse_timestamp(raw: &str) -> SidecarResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| SidecarError::database(format!("invalid timestamp '{}': {}", raw, e)))
    }

    fn row_to_resource(row: ResourceRow) -> SidecarResult<Resource> {
        let (id, kind, title, source, md_path, assets, vector_index, created_at, updated_at) = row;
        let resource_type = ResourceType::from_str(&kind)
            .map_err(|_| SidecarError::database(format!("invalid resource type '{}'", kind)))?;

        Ok(Resource {
            id,
            resource_type,
            title,
            source,
            md_path,
            assets: serde_json::from_str(&assets)?,
            vector_index,
            created_at: Self::parse_timestamp(&created_at)?,
            updated_at: Self::parse_timestamp(&updated_at)?,
        })
    }
}

impl ResourceStore for SqliteStore {
    fn create(&self, resource: &Resource) -> SidecarResult<()> {
        let assets = serde_json::to_string(&resource.assets)?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO resources (
                id, type, title, source, md_path, assets, vector_index, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                resource.id,
                resource.resource_type.as_ref(),
                resource.title,
                resource.source,
                resource.md_path,
                assets,
                resource.vector_index,
                resource.created_at.to_rfc3339(),
                resource.updated_at.to_rfc3339(),
            ],
        )?;
        debug!(id = %resource.id, "Stored resource");
        Ok(())
    }

    fn update(&self, resource: &Resource) -> SidecarResult<bool> {
        let assets = serde_json::to_string(&resource.assets)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            r#"
            UPDATE resources
            SET type = ?2, title = ?3, source = ?4, md_path = ?5, assets = ?6,
                vector_index = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                resource.id,
                resource.resource_type.as_ref(),
                resource.title,
                resource.source,
                resource.md_path,
                assets,
                resource.vector_index,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn get(&self, id: &str) -> SidecarResult<Option<Resource>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                r#"
                SELECT id, type, title, source, md_path, assets, vector_index,
                       created_at, updated_at
                FROM resources WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .optional()?;

        row.map(Self::row_to_resource).transpose()
    }
}
