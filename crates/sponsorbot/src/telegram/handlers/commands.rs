//! Command handler implementations (/start, /admin) and admin text input

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};

use super::types::{display_name_of, sender_id_of, track_user, HandlerDeps, HandlerError};
use crate::telegram::admin::{is_admin, panel_screen, run_admin_action};
use crate::telegram::keyboards::channels_keyboard;
use crate::telegram::{texts, Bot};

/// Handle /start command
pub(super) async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let name = match msg.from.as_ref() {
        Some(user) => {
            track_user(deps, user);
            display_name_of(user)
        }
        None => String::new(),
    };

    let channels = match deps.registry.list_active(Utc::now()) {
        Ok(channels) => channels,
        Err(e) => {
            log::error!("Failed to load channels for /start in chat {}: {}", msg.chat.id, e);
            bot.send_message(msg.chat.id, texts::TRY_AGAIN).await?;
            return Ok(());
        }
    };

    if channels.is_empty() {
        bot.send_message(msg.chat.id, texts::NO_CHANNELS).await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, texts::welcome(&name, deps.bot_username.as_deref()))
        .parse_mode(ParseMode::Html)
        .reply_markup(channels_keyboard(&channels))
        .await?;
    Ok(())
}

/// Handle /admin command
pub(super) async fn handle_admin_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user_id = sender_id_of(msg).unwrap_or(0);
    if !is_admin(user_id) {
        log::warn!("Non-admin {} tried to open the admin panel", user_id);
        bot.send_message(msg.chat.id, texts::NOT_ADMIN).await?;
        return Ok(());
    }

    deps.clear_admin_action(user_id);
    let screen = panel_screen();
    let mut request = bot.send_message(msg.chat.id, screen.text);
    if let Some(keyboard) = screen.keyboard {
        request = request.reply_markup(keyboard);
    }
    request.await?;
    Ok(())
}

/// Handle the plain-text answer to a pending admin prompt
pub(super) async fn handle_admin_text(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(action) = sender_id_of(msg).and_then(|admin_id| deps.take_admin_action(admin_id)) else {
        return Ok(());
    };
    let text = msg.text().unwrap_or_default();

    let reply = run_admin_action(deps, action, text).await;
    bot.send_message(msg.chat.id, reply).parse_mode(ParseMode::Html).await?;
    Ok(())
}
