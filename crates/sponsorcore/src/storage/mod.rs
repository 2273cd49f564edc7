//! Database pool and schema migrations

pub mod db;
pub mod migrations;

// Re-exports for convenience
pub use db::{create_pool, get_connection, now_timestamp, timestamp_to_datetime, DbConnection, DbPool};
