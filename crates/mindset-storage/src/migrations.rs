//! Database schema migrations.
//!
//! Applies the initial schema: the profiles and messages tables plus the
//! schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use mindset_core::error::MindsetError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), MindsetError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| MindsetError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| MindsetError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: profiles and message history.
fn apply_v1(conn: &Connection) -> Result<(), MindsetError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY NOT NULL,
            sport       TEXT,
            goals       TEXT,
            level       TEXT,
            notes       TEXT,
            updated_at  INTEGER NOT NULL
        );

        -- Append-only. The rowid breaks ties between equal timestamps.
        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user_created
            ON messages (user_id, created_at ASC, id ASC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| MindsetError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
