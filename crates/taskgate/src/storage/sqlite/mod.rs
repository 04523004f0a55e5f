//! `SQLite` storage backend.
//!
//! `SQLite` is the source of truth for this backend: tasks, users and the
//! dependency relation each live in their own table (see `schema`). The
//! composite primary key on `task_dependencies` enforces edge uniqueness.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `helpers` - Row conversion and parsing utilities
//! - `transaction` - [`StoreTransaction`](crate::storage::StoreTransaction) implementation
//!
//! ## Transactions
//!
//! The single connection sits behind a tokio `Mutex`. A transaction takes an
//! owned lock and issues `BEGIN IMMEDIATE`, so it holds the database write
//! lock from the start. A connection from another process that finds the
//! lock taken waits up to [`BUSY_TIMEOUT`] before failing with
//! `SQLITE_BUSY`. Commit issues `COMMIT`; dropping an unfinished transaction
//! issues `ROLLBACK`.

mod helpers;
mod schema;
mod transaction;

use crate::error::Result;
use crate::storage::{StoreTransaction, TaskStore};
use async_trait::async_trait;
use rusqlite::Connection;
use schema::SCHEMA;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use transaction::SqliteTransaction;

/// How long a transaction waits for another connection's write lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// `SQLite`-backed task store.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("conn", &"<rusqlite::Connection>")
            .finish()
    }
}

impl SqliteStore {
    /// Open or create the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the
    /// database cannot be opened, or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = ?path, "Opened SQLite task store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let conn = Arc::clone(&self.conn).lock_owned().await;
        Ok(Box::new(SqliteTransaction::begin(conn)?))
    }
}
