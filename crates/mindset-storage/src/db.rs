//! SQLite handle shared by the profile and history repositories.
//!
//! One file holds both tables: `profiles` (one row per athlete, replaced on
//! every write) and `messages` (append-only chat turns). Opening a handle
//! always brings the schema up to date.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use mindset_core::error::MindsetError;

use crate::migrations;

/// Pragmas for on-disk databases.
const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
                            PRAGMA synchronous = NORMAL;
                            PRAGMA foreign_keys = ON;";

const MEMORY_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// Profile and history storage. Repositories share it through an `Arc`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open `path` (creating parent directories) and migrate it.
    pub fn new(path: &Path) -> Result<Self, MindsetError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            MindsetError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let db = Self::prepare(conn, FILE_PRAGMAS)?;

        info!(path = %path.display(), "Profile and history database ready");
        Ok(db)
    }

    /// A throwaway database with the full schema, used by tests and fakes.
    pub fn in_memory() -> Result<Self, MindsetError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MindsetError::Storage(format!("Failed to open in-memory db: {}", e)))?;
        Self::prepare(conn, MEMORY_PRAGMAS)
    }

    fn prepare(conn: Connection, pragmas: &str) -> Result<Self, MindsetError> {
        conn.execute_batch(pragmas)
            .map_err(|e| MindsetError::Storage(format!("Failed to set pragmas: {}", e)))?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` against the connection. Calls are serialized.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, MindsetError>
    where
        F: FnOnce(&Connection) -> Result<T, MindsetError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| MindsetError::Storage("Database mutex poisoned".to_string()))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
