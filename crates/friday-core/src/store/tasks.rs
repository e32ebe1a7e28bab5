//! `tasks` table of the SQLite store.

use std::str::FromStr;

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::sqlite::SqliteStore;
use crate::error::{SidecarError, SidecarResult};
use crate::traits::TaskStore;
use crate::types::{Task, TaskStatus};

type TaskRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

const SELECT_TASK: &str = r#"
    SELECT id, status, cmd, payload, result, error, created_at, updated_at
    FROM tasks
"#;

fn read_row(row: &Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn row_to_task(row: TaskRow) -> SidecarResult<Task> {
    let (id, status, cmd, payload, result, error, created_at, updated_at) = row;
    let status = TaskStatus::from_str(&status)
        .map_err(|_| SidecarError::database(format!("invalid task status '{}'", status)))?;

    Ok(Task {
        id,
        status,
        cmd,
        payload: serde_json::from_str(&payload)?,
        result: result.map(|r| serde_json::from_str(&r)).transpose()?,
        error,
        created_at: SqliteStore::parse_timestamp(&created_at)?,
        updated_at: SqliteStore::parse_timestamp(&updated_at)?,
    })
}

impl TaskStore for SqliteStore {
    fn create_task(&self, task: &Task) -> SidecarResult<()> {
        let payload = serde_json::to_string(&task.payload)?;
        let result = task.result.as_ref().map(serde_json::to_string).transpose()?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO tasks (id, status, cmd, payload, result, error, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                task.id,
                task.status.as_ref(),
                task.cmd,
                payload,
                result,
                task.error,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        debug!(id = %task.id, status = %task.status, "Stored task");
        Ok(())
    }

    fn update_task(&self, task: &Task) -> SidecarResult<bool> {
        let result = task.result.as_ref().map(serde_json::to_string).transpose()?;
        let conn = self.lock()?;
        let changed = conn.execute(
            r#"
            UPDATE tasks
            SET status = ?2, result = ?3, error = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                task.id,
                task.status.as_ref(),
                result,
                task.error,
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn get_task(&self, id: &str) -> SidecarResult<Option<Task>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_TASK),
                params![id],
                read_row,
            )
            .optional()?;

        row.map(row_to_task).transpose()
    }

    fn list_tasks(&self, limit: usize) -> SidecarResult<Vec<Task>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY rowid DESC LIMIT ?1", SELECT_TASK))?;
        let rows = stmt
            .query_map(params![limit], read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(row_to_task).collect()
    }
}
