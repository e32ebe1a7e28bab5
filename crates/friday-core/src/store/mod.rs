//! Store implementations.

mod sqlite;
mod tasks;

pub use sqlite::SqliteStore;
