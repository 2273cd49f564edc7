//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the Telegram bot.
//! The handlers are organized in a testable way, allowing integration tests
//! to use the same handler tree as production code.

mod callbacks;
mod commands;
mod schema;
mod types;

pub use schema::schema;
pub use types::{display_name_of, sender_id_of, track_user, user_id_of, AdminAction, HandlerDeps, HandlerError};
