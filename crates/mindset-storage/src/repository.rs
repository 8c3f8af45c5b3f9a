//! Repository implementations for SQLite-backed persistence.
//!
//! Provides ProfileRepository and HistoryRepository, which implement the
//! ProfileStore and HistoryStore ports on top of the Database struct.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use tracing::debug;

use mindset_core::error::{MindsetError, Result};
use mindset_core::ports::{HistoryStore, ProfileStore};
use mindset_core::types::{ConversationTurn, ProfileAttributes, Role, UserProfile};

use crate::db::Database;

// =============================================================================
// Profiles
// =============================================================================

/// Repository for user profiles, keyed by the external user id.
pub struct ProfileRepository {
    db: Arc<Database>,
}

impl ProfileRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Find a profile by user id.
    pub fn find(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, sport, goals, level, notes, updated_at
                 FROM profiles WHERE id = ?1",
                rusqlite::params![user_id],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        attributes: ProfileAttributes {
                            sport: row.get(1)?,
                            goals: row.get(2)?,
                            level: row.get(3)?,
                            notes: row.get(4)?,
                        },
                        updated_at: millis_to_datetime(row.get(5)?),
                    })
                },
            )
            .optional()
            .map_err(|e| MindsetError::Storage(format!("Failed to load profile: {}", e)))
        })
    }

    /// Insert or replace the full attribute set for a user.
    pub fn upsert(&self, user_id: &str, attributes: ProfileAttributes) -> Result<UserProfile> {
        let updated_at = Utc::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, sport, goals, level, notes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    sport = excluded.sport,
                    goals = excluded.goals,
                    level = excluded.level,
                    notes = excluded.notes,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    user_id,
                    attributes.sport,
                    attributes.goals,
                    attributes.level,
                    attributes.notes,
                    updated_at.timestamp_millis(),
                ],
            )
            .map_err(|e| MindsetError::Storage(format!("Failed to save profile: {}", e)))?;
            Ok(())
        })?;

        debug!(user_id, "profile written");

        Ok(UserProfile {
            id: user_id.to_string(),
            attributes,
            updated_at: millis_to_datetime(updated_at.timestamp_millis()),
        })
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.find(user_id)
    }

    async fn put(&self, user_id: &str, attributes: ProfileAttributes) -> Result<UserProfile> {
        self.upsert(user_id, attributes)
    }
}

// =============================================================================
// History
// =============================================================================

/// Append-only repository for conversation turns.
pub struct HistoryRepository {
    db: Arc<Database>,
}

impl HistoryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store one turn.
    pub fn insert(&self, turn: &ConversationTurn) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (user_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    turn.user_id,
                    turn.role.as_str(),
                    turn.content,
                    turn.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| MindsetError::Storage(format!("Failed to append message: {}", e)))?;
            Ok(())
        })
    }

    /// All turns for a user, oldest first. Insertion order breaks timestamp ties.
    pub fn find_by_user(&self, user_id: &str) -> Result<Vec<ConversationTurn>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT user_id, role, content, created_at
                     FROM messages
                     WHERE user_id = ?1
                     ORDER BY created_at ASC, id ASC",
                )
                .map_err(|e| MindsetError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|e| MindsetError::Storage(e.to_string()))?;

            let mut turns = Vec::new();
            for row in rows {
                let (user_id, role, content, created_at) =
                    row.map_err(|e| MindsetError::Storage(e.to_string()))?;
                let role: Role = role.parse().map_err(MindsetError::Storage)?;
                turns.push(ConversationTurn {
                    user_id,
                    role,
                    content,
                    created_at: millis_to_datetime(created_at),
                });
            }
            Ok(turns)
        })
    }

    /// Number of stored turns for a user.
    pub fn count_by_user(&self, user_id: &str) -> Result<u64> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|e| MindsetError::Storage(e.to_string()))
        })
    }
}

#[async_trait]
impl HistoryStore for HistoryRepository {
    async fn append(&self, turn: &ConversationTurn) -> Result<()> {
        self.insert(turn)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<ConversationTurn>> {
        self.find_by_user(user_id)
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
