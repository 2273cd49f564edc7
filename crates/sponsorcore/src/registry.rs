//! Channel registry: the channels a user must join before getting a reward.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::core::config;
use crate::core::error::{is_unique_violation, AppError, AppResult};
use crate::storage::{get_connection, timestamp_to_datetime, DbPool};

/// A required channel row from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Internal id (insertion order)
    pub id: i64,
    /// `@handle` or numeric chat id such as `-1001234567890`
    pub identifier: String,
    pub title: String,
    /// Ascending display and check order
    pub order_key: i64,
    /// `None` means the channel never expires
    pub expires_at: Option<DateTime<Utc>>,
    /// `None` means no subscriber cap
    pub max_subscribers: Option<u32>,
    /// The bot holds admin rights in the channel
    pub bot_admin: bool,
    pub subscriber_count: u64,
}

impl Channel {
    /// Whether the channel is still part of the requirement at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let not_expired = self.expires_at.map_or(true, |until| until > now);
        let under_cap = self
            .max_subscribers
            .map_or(true, |cap| self.subscriber_count < u64::from(cap));
        not_expired && under_cap
    }

    /// Public `t.me` link, only known for `@handle` channels
    pub fn public_link(&self) -> Option<String> {
        self.identifier
            .strip_prefix('@')
            .filter(|name| !name.is_empty())
            .map(|name| format!("https://t.me/{}", name))
    }
}

/// Fields of a channel an administrator provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    pub identifier: String,
    pub title: String,
    pub order_key: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_subscribers: Option<u32>,
}

impl NewChannel {
    /// Creates a channel with the default order key, no expiry and no cap.
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            order_key: config::channels::DEFAULT_ORDER_KEY,
            expires_at: None,
            max_subscribers: None,
        }
    }

    /// Sets the ordering key.
    #[must_use]
    pub fn order_key(mut self, order_key: i64) -> Self {
        self.order_key = order_key;
        self
    }

    /// Sets the expiry timestamp.
    #[must_use]
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the subscriber cap.
    #[must_use]
    pub fn max_subscribers(mut self, cap: u32) -> Self {
        self.max_subscribers = Some(cap);
        self
    }

    /// Parses the admin dialogue format `link|title|max|order|hours`.
    ///
    /// - `link` goes through [`parse_channel_identifier`]
    /// - `max` is a positive number or one of max/unlimited/none/-1
    /// - `order` falls back to the default order key
    /// - `hours` is the display window from `now`; zero or garbage means no expiry
    pub fn parse_admin_form(text: &str, now: DateTime<Utc>) -> AppResult<Self> {
        let parts: Vec<&str> = text.split('|').map(str::trim).collect();
        if parts.len() < 5 {
            return Err(AppError::Validation(
                "expected link|title|max|order|hours".to_string(),
            ));
        }

        let identifier = parse_channel_identifier(parts[0]);
        if identifier.len() < 2 {
            return Err(AppError::Validation("channel link is empty".to_string()));
        }

        let title = if parts[1].is_empty() {
            identifier.clone()
        } else {
            parts[1].to_string()
        };

        let max_subscribers = match parts[2].to_lowercase().as_str() {
            "max" | "unlimited" | "none" | "-1" => None,
            other => other.parse::<u32>().ok().filter(|cap| *cap > 0),
        };

        let order_key = parts[3]
            .parse::<i64>()
            .unwrap_or(config::channels::DEFAULT_ORDER_KEY);

        let expires_at = match parts[4].parse::<f64>().ok().filter(|hours| hours.is_finite() && *hours > 0.0) {
            Some(hours) => Some(
                ChronoDuration::try_seconds((hours * 3600.0) as i64)
                    .and_then(|window| now.checked_add_signed(window))
                    .ok_or_else(|| AppError::Validation("hours is out of range".to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            identifier,
            title,
            order_key,
            expires_at,
            max_subscribers,
        })
    }
}

/// Normalises whatever an administrator pasted into a channel identifier.
///
/// Accepts `t.me` links, bare usernames, `@usernames` and `-100…` chat ids.
pub fn parse_channel_identifier(raw: &str) -> String {
    let mut s = raw.trim();

    if s.starts_with("http://") || s.starts_with("https://") {
        if let Some(idx) = s.rfind("t.me/") {
            s = &s[idx + "t.me/".len()..];
        }
    }
    if let Some(rest) = s.strip_prefix("t.me/") {
        s = rest;
    }
    let s = s.trim_end_matches('/');

    if s.starts_with('-') || s.starts_with('@') {
        return s.to_string();
    }
    format!("@{}", s)
}

const CHANNEL_COLUMNS: &str =
    "id, identifier, title, order_key, expires_at, max_subscribers, bot_admin, subscriber_count";

fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    let expires_at: Option<i64> = row.get(4)?;
    Ok(Channel {
        id: row.get(0)?,
        identifier: row.get(1)?,
        title: row.get(2)?,
        order_key: row.get(3)?,
        expires_at: expires_at.map(timestamp_to_datetime),
        max_subscribers: row.get(5)?,
        bot_admin: row.get::<_, i32>(6)? != 0,
        subscriber_count: row.get::<_, i64>(7)?.max(0) as u64,
    })
}

/// Store of required channels.
#[derive(Clone)]
pub struct ChannelRegistry {
    db_pool: Arc<DbPool>,
}

impl ChannelRegistry {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Channels required at `now`, ordered by order key then insertion.
    ///
    /// Expired channels and channels whose subscriber cap is reached are left out.
    pub fn list_active(&self, now: DateTime<Utc>) -> AppResult<Vec<Channel>> {
        let conn = get_connection(&self.db_pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels
             WHERE (expires_at IS NULL OR expires_at > ?1)
               AND (max_subscribers IS NULL OR subscriber_count < max_subscribers)
             ORDER BY order_key ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![now.timestamp()], parse_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every channel, expired ones included, in the same order as `list_active`.
    pub fn list_all(&self) -> AppResult<Vec<Channel>> {
        let conn = get_connection(&self.db_pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY order_key ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], parse_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Channels where the bot holds admin rights (broadcast targets).
    pub fn list_bot_admin(&self) -> AppResult<Vec<Channel>> {
        let conn = get_connection(&self.db_pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE bot_admin = 1 ORDER BY order_key ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], parse_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, id: i64) -> AppResult<Option<Channel>> {
        let conn = get_connection(&self.db_pool)?;
        let channel = conn
            .query_row(
                &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1"),
                params![id],
                parse_row,
            )
            .optional()?;
        Ok(channel)
    }

    pub fn count(&self) -> AppResult<u64> {
        let conn = get_connection(&self.db_pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM channels", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Strict insert. Returns the new internal id.
    ///
    /// Fails with `DuplicateIdentifier` if the identifier is already registered.
    pub fn insert(&self, channel: &NewChannel) -> AppResult<i64> {
        validate(channel)?;
        let conn = get_connection(&self.db_pool)?;
        let result = conn.execute(
            "INSERT INTO channels (identifier, title, order_key, expires_at, max_subscribers)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                channel.identifier,
                channel.title,
                channel.order_key,
                channel.expires_at.map(|t| t.timestamp()),
                channel.max_subscribers,
            ],
        );

        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                log::info!("Registered channel {} (id {})", channel.identifier, id);
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateIdentifier(channel.identifier.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces every mutable field of the channel with internal id `id`.
    ///
    /// Returns `false` when no such row exists. Counter and bot-admin flag are kept.
    pub fn update(&self, id: i64, channel: &NewChannel) -> AppResult<bool> {
        validate(channel)?;
        let conn = get_connection(&self.db_pool)?;
        let result = conn.execute(
            "UPDATE channels
             SET identifier = ?1, title = ?2, order_key = ?3, expires_at = ?4, max_subscribers = ?5
             WHERE id = ?6",
            params![
                channel.identifier,
                channel.title,
                channel.order_key,
                channel.expires_at.map(|t| t.timestamp()),
                channel.max_subscribers,
                id,
            ],
        );

        match result {
            Ok(changed) => Ok(changed > 0),
            Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateIdentifier(channel.identifier.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a channel. Deleting a missing id is not an error.
    pub fn remove(&self, id: i64) -> AppResult<()> {
        let conn = get_connection(&self.db_pool)?;
        let removed = conn.execute("DELETE FROM channels WHERE id = ?1", params![id])?;
        if removed > 0 {
            log::info!("Removed channel id {}", id);
        }
        Ok(())
    }

    /// Records whether the bot holds admin rights in the channel.
    pub fn set_bot_admin_flag(&self, identifier: &str, bot_admin: bool) -> AppResult<()> {
        let conn = get_connection(&self.db_pool)?;
        conn.execute(
            "UPDATE channels SET bot_admin = ?1 WHERE identifier = ?2",
            params![i32::from(bot_admin), identifier],
        )?;
        Ok(())
    }

    /// Bumps the subscriber counter of each listed channel by one.
    ///
    /// A counter never passes the channel's cap.
    pub fn record_subscribers(&self, channel_ids: &[i64]) -> AppResult<()> {
        if channel_ids.is_empty() {
            return Ok(());
        }
        let mut conn = get_connection(&self.db_pool)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE channels SET subscriber_count = subscriber_count + 1
                 WHERE id = ?1 AND (max_subscribers IS NULL OR subscriber_count < max_subscribers)",
            )?;
            for id in channel_ids {
                stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn validate(channel: &NewChannel) -> AppResult<()> {
    if channel.identifier.trim().is_empty() || channel.identifier == "@" {
        return Err(AppError::Validation("channel identifier is empty".to_string()));
    }
    if channel.title.trim().is_empty() {
        return Err(AppError::Validation("channel title is empty".to_string()));
    }
    Ok(())
}
