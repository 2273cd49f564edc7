//! Reward ledger: reward tokens and the log of who received which one.
//!
//! Dispensing policy: the newest token wins, regardless of who asks.
//! Issuance is idempotent per (token, user): the log holds at most one record
//! for a pair and the token's counter moves only when a record is appended.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, AppResult};
use crate::storage::{get_connection, now_timestamp, timestamp_to_datetime, DbPool};

/// A reward token an administrator added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardToken {
    pub id: i64,
    /// Opaque payload handed to users (e.g. a VPN access code)
    pub payload: String,
    pub created_at: DateTime<Utc>,
    /// How many users received this token; never decreases
    pub sent_count: u64,
}

/// One issuance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseRecord {
    pub id: i64,
    pub token_id: i64,
    pub user_id: i64,
    pub dispensed_at: DateTime<Utc>,
}

/// Result of a successful `dispense` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseReceipt {
    /// A record was appended and the counter incremented
    Recorded {
        /// Token counter after the increment
        sent_count: u64,
        /// This is the first record for the user across all tokens
        first_for_user: bool,
    },
    /// The user already holds a record for this token; nothing changed
    AlreadyRecorded,
}

/// Aggregate numbers for the admin statistics screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub tokens: u64,
    pub dispensed: u64,
    pub rewarded_users: u64,
}

fn parse_token_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RewardToken> {
    Ok(RewardToken {
        id: row.get(0)?,
        payload: row.get(1)?,
        created_at: timestamp_to_datetime(row.get(2)?),
        sent_count: row.get::<_, i64>(3)?.max(0) as u64,
    })
}

fn parse_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DispenseRecord> {
    Ok(DispenseRecord {
        id: row.get(0)?,
        token_id: row.get(1)?,
        user_id: row.get(2)?,
        dispensed_at: timestamp_to_datetime(row.get(3)?),
    })
}

/// Store of reward tokens and the dispense log.
#[derive(Clone)]
pub struct RewardLedger {
    db_pool: Arc<DbPool>,
}

impl RewardLedger {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Adds a token with a zero counter. Returns its id.
    pub fn add_token(&self, payload: &str) -> AppResult<i64> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(AppError::Validation("reward token is empty".to_string()));
        }

        let conn = get_connection(&self.db_pool)?;
        conn.execute(
            "INSERT INTO reward_tokens (payload, sent_count, created_at) VALUES (?1, 0, ?2)",
            params![payload, now_timestamp()],
        )?;
        let id = conn.last_insert_rowid();
        log::info!("Added reward token id {}", id);
        Ok(id)
    }

    /// Deletes a token. Deleting a missing id is not an error.
    ///
    /// The dispense log keeps its records for the deleted token.
    pub fn remove_token(&self, token_id: i64) -> AppResult<()> {
        let conn = get_connection(&self.db_pool)?;
        let removed = conn.execute("DELETE FROM reward_tokens WHERE id = ?1", params![token_id])?;
        if removed > 0 {
            log::info!("Removed reward token id {}", token_id);
        }
        Ok(())
    }

    /// The most recently created token, if any.
    pub fn latest_token(&self) -> AppResult<Option<RewardToken>> {
        let conn = get_connection(&self.db_pool)?;
        let token = conn
            .query_row(
                "SELECT id, payload, created_at, sent_count FROM reward_tokens
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                [],
                parse_token_row,
            )
            .optional()?;
        Ok(token)
    }

    pub fn get_token(&self, token_id: i64) -> AppResult<Option<RewardToken>> {
        let conn = get_connection(&self.db_pool)?;
        let token = conn
            .query_row(
                "SELECT id, payload, created_at, sent_count FROM reward_tokens WHERE id = ?1",
                params![token_id],
                parse_token_row,
            )
            .optional()?;
        Ok(token)
    }

    /// All tokens, newest first.
    pub fn list_tokens(&self) -> AppResult<Vec<RewardToken>> {
        let conn = get_connection(&self.db_pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, payload, created_at, sent_count FROM reward_tokens
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], parse_token_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Whether `user_id` already holds a record for `token_id`.
    pub fn has_dispensed(&self, token_id: i64, user_id: i64) -> AppResult<bool> {
        let conn = get_connection(&self.db_pool)?;
        let found = conn
            .query_row(
                "SELECT 1 FROM dispense_log WHERE token_id = ?1 AND user_id = ?2",
                params![token_id, user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Dispense history of one user, oldest first.
    pub fn records_for_user(&self, user_id: i64) -> AppResult<Vec<DispenseRecord>> {
        let conn = get_connection(&self.db_pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, token_id, user_id, dispensed_at FROM dispense_log
             WHERE user_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], parse_record_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Records that `token_id` was delivered to `user_id`.
    ///
    /// Runs in one `BEGIN IMMEDIATE` transaction so concurrent calls queue on
    /// the SQLite write lock and no increment is lost. Fails with
    /// `TokenNotFound` if the token was removed after it was selected.
    pub fn dispense(&self, token_id: i64, user_id: i64) -> AppResult<DispenseReceipt> {
        let mut conn = get_connection(&self.db_pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM reward_tokens WHERE id = ?1",
                params![token_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(AppError::TokenNotFound(token_id));
        }

        let appended = tx.execute(
            "INSERT OR IGNORE INTO dispense_log (token_id, user_id, dispensed_at) VALUES (?1, ?2, ?3)",
            params![token_id, user_id, now_timestamp()],
        )?;
        if appended == 0 {
            tx.commit()?;
            return Ok(DispenseReceipt::AlreadyRecorded);
        }

        let sent_count: i64 = tx.query_row(
            "UPDATE reward_tokens SET sent_count = sent_count + 1 WHERE id = ?1 RETURNING sent_count",
            params![token_id],
            |row| row.get(0),
        )?;
        let user_records: i64 = tx.query_row(
            "SELECT COUNT(*) FROM dispense_log WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        log::info!(
            "Dispensed token {} to user {} (sent_count {})",
            token_id,
            user_id,
            sent_count
        );

        Ok(DispenseReceipt::Recorded {
            sent_count: sent_count.max(0) as u64,
            first_for_user: user_records == 1,
        })
    }

    pub fn count_tokens(&self) -> AppResult<u64> {
        let conn = get_connection(&self.db_pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM reward_tokens", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Number of dispense records across all tokens.
    pub fn count_dispensed(&self) -> AppResult<u64> {
        let conn = get_connection(&self.db_pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM dispense_log", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn stats(&self) -> AppResult<LedgerStats> {
        let conn = get_connection(&self.db_pool)?;
        let rewarded_users: i64 =
            conn.query_row("SELECT COUNT(DISTINCT user_id) FROM dispense_log", [], |row| row.get(0))?;
        Ok(LedgerStats {
            tokens: self.count_tokens()?,
            dispensed: self.count_dispensed()?,
            rewarded_users: rewarded_users.max(0) as u64,
        })
    }
}
