//! Callback query handling: the confirm button, channel details and the admin panel

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MaybeInaccessibleMessage, ParseMode};

use sponsorcore::ConfirmOutcome;

use super::types::{track_user, user_id_of, HandlerDeps, HandlerError};
use crate::telegram::admin::{admin_screen, is_admin};
use crate::telegram::keyboards::{channel_details_keyboard, missing_channels_keyboard, CallbackAction};
use crate::telegram::{texts, Bot};

/// Replaces the text (and keyboard) of the message the button belongs to
async fn edit_callback_message(
    bot: &Bot,
    q: &CallbackQuery,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<(), HandlerError> {
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let (chat_id, message_id) = match message {
        MaybeInaccessibleMessage::Regular(msg) => (msg.chat.id, msg.id),
        MaybeInaccessibleMessage::Inaccessible(msg) => (msg.chat.id, msg.message_id),
    };

    let mut request = bot.edit_message_text(chat_id, message_id, text).parse_mode(ParseMode::Html);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }
    if let Err(e) = request.await {
        // "message is not modified" when a user presses the same button twice
        log::warn!("Failed to edit callback message in chat {}: {}", chat_id, e);
    }
    Ok(())
}

pub(super) async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let data = q.data.as_deref().unwrap_or_default();
    let Some(action) = CallbackAction::parse(data) else {
        log::debug!("Ignoring unknown callback data {:?}", data);
        return Ok(());
    };

    track_user(deps, &q.from);
    let user_id = user_id_of(&q.from);

    match action {
        CallbackAction::ConfirmSubscription => {
            let (text, keyboard) = match deps.orchestrator.confirm(user_id).await {
                Ok(outcome) => {
                    let keyboard = match &outcome {
                        ConfirmOutcome::Incomplete { missing } => Some(missing_channels_keyboard(missing)),
                        _ => None,
                    };
                    (texts::confirm_outcome(&outcome), keyboard)
                }
                Err(e) => {
                    log::error!("Confirm failed for user {}: {}", user_id, e);
                    (texts::TRY_AGAIN.to_string(), None)
                }
            };
            edit_callback_message(bot, q, text, keyboard).await
        }
        CallbackAction::ChannelDetails(id) => {
            let (text, keyboard) = match deps.registry.get(id) {
                Ok(Some(channel)) => (texts::channel_details(&channel), Some(channel_details_keyboard(&channel))),
                Ok(None) => ("Channel not found.".to_string(), None),
                Err(e) => {
                    log::error!("Failed to load channel {}: {}", id, e);
                    (texts::TRY_AGAIN.to_string(), None)
                }
            };
            edit_callback_message(bot, q, text, keyboard).await
        }
        CallbackAction::Admin(callback) => {
            if !is_admin(user_id) {
                return edit_callback_message(bot, q, texts::NOT_ADMIN.to_string(), None).await;
            }
            let screen = admin_screen(deps, user_id, callback).await;
            edit_callback_message(bot, q, screen.text, screen.keyboard).await
        }
    }
}
