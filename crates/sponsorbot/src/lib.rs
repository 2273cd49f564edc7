//! Sponsorbot - Telegram front end for the sponsor reward workflow
//!
//! The membership and reward logic lives in `sponsorcore`; this crate adds
//! the Telegram implementation of the platform seam, the dispatcher tree,
//! keyboards, message texts and the admin panel.
//!
//! # Module Structure
//!
//! - `cli`: Command line interface
//! - `stats`: Aggregate numbers for the admin panel and the CLI
//! - `telegram`: Bot setup, handlers, presentation and broadcast

pub mod cli;
pub mod stats;
pub mod telegram;

pub use telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramPlatform};
