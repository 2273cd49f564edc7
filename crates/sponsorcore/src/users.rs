//! User directory: profiles of everyone who talked to the bot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::core::error::AppResult;
use crate::storage::{get_connection, now_timestamp, timestamp_to_datetime, DbPool};

/// Structure representing a user from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Telegram ID of the user
    pub user_id: i64,
    /// Username without the leading `@`, if the user has one
    pub username: Option<String>,
    pub display_name: String,
    pub registered_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct UserDirectory {
    db_pool: Arc<DbPool>,
}

impl UserDirectory {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates the profile or refreshes its names and activity timestamp.
    ///
    /// The registration timestamp is set once and never overwritten.
    pub fn touch(&self, user_id: i64, username: Option<&str>, display_name: &str) -> AppResult<()> {
        let conn = get_connection(&self.db_pool)?;
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO users (user_id, username, display_name, registered_at, last_active_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                last_active_at = excluded.last_active_at",
            params![user_id, username, display_name, now],
        )?;
        log::debug!("Touched user {}", user_id);
        Ok(())
    }

    pub fn get(&self, user_id: i64) -> AppResult<Option<UserProfile>> {
        let conn = get_connection(&self.db_pool)?;
        let profile = conn
            .query_row(
                "SELECT user_id, username, display_name, registered_at, last_active_at
                 FROM users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                        registered_at: timestamp_to_datetime(row.get(3)?),
                        last_active_at: timestamp_to_datetime(row.get(4)?),
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    pub fn count(&self) -> AppResult<u64> {
        let conn = get_connection(&self.db_pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Ids of every known user, for broadcasts.
    pub fn list_ids(&self) -> AppResult<Vec<i64>> {
        let conn = get_connection(&self.db_pool)?;
        let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY registered_at ASC, user_id ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<i64>>>()?)
    }
}
