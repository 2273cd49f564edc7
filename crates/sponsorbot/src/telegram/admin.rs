//! Admin panel
//!
//! Panel navigation produces an `AdminScreen`; prompts register an
//! `AdminAction` for the admin and the next plain-text message is fed
//! to `run_admin_action`. Both are independent of the Bot API so they can be
//! exercised with any `MessagingPlatform`.

use chrono::Utc;
use teloxide::types::InlineKeyboardMarkup;

use sponsorcore::{config, AppError, NewChannel};

use crate::stats::BotStats;
use crate::telegram::broadcast::{broadcast_to_channels, broadcast_to_users};
use crate::telegram::handlers::{AdminAction, HandlerDeps};
use crate::telegram::keyboards::{
    admin_back_keyboard, admin_channels_keyboard, admin_panel_keyboard, admin_tokens_keyboard, AdminCallback,
};
use crate::telegram::texts;

/// Check if user is admin
pub fn is_admin(user_id: i64) -> bool {
    config::admin::is_admin(user_id)
}

/// Text and keyboard to put in place of the panel message
#[derive(Debug, Clone)]
pub struct AdminScreen {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl AdminScreen {
    fn menu(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }
}

pub fn panel_screen() -> AdminScreen {
    AdminScreen::menu(texts::ADMIN_PANEL, admin_panel_keyboard())
}

fn prompt(deps: &HandlerDeps, admin_id: i64, action: AdminAction, text: &str) -> AdminScreen {
    deps.set_admin_action(admin_id, action);
    log::info!("Admin {} started {}", admin_id, action);
    AdminScreen::plain(text)
}

/// Handles one admin panel button pressed by `admin_id`
pub async fn admin_screen(deps: &HandlerDeps, admin_id: i64, callback: AdminCallback) -> AdminScreen {
    // Navigating away abandons any pending prompt
    deps.clear_admin_action(admin_id);

    match callback {
        AdminCallback::Open => panel_screen(),
        AdminCallback::Close => AdminScreen::plain(texts::ADMIN_CLOSED),
        AdminCallback::Channels => AdminScreen::menu(texts::CHANNELS_MENU, admin_channels_keyboard()),
        AdminCallback::Tokens => AdminScreen::menu(texts::TOKENS_MENU, admin_tokens_keyboard()),
        AdminCallback::Stats => match BotStats::collect(&deps.registry, &deps.ledger, &deps.users) {
            Ok(stats) => AdminScreen::menu(stats.render(), admin_back_keyboard()),
            Err(e) => {
                log::error!("Failed to collect stats: {}", e);
                AdminScreen::menu(texts::TRY_AGAIN, admin_back_keyboard())
            }
        },
        AdminCallback::BroadcastUsers => prompt(deps, admin_id, AdminAction::BroadcastUsers, texts::ASK_BROADCAST_USERS),
        AdminCallback::BroadcastChannels => prompt(
            deps,
            admin_id,
            AdminAction::BroadcastChannels,
            texts::ASK_BROADCAST_CHANNELS,
        ),
        AdminCallback::AddChannel => prompt(deps, admin_id, AdminAction::AddChannel, texts::ASK_CHANNEL_FORM),
        AdminCallback::RemoveChannel => prompt(deps, admin_id, AdminAction::RemoveChannel, texts::ASK_CHANNEL_ID),
        AdminCallback::AddToken => prompt(deps, admin_id, AdminAction::AddToken, texts::ASK_TOKEN_TEXT),
        AdminCallback::RemoveToken => prompt(deps, admin_id, AdminAction::RemoveToken, texts::ASK_TOKEN_ID),
        AdminCallback::ListChannels => match deps.registry.list_all() {
            Ok(channels) => AdminScreen::menu(texts::channel_list(&channels), admin_channels_keyboard()),
            Err(e) => {
                log::error!("Failed to list channels: {}", e);
                AdminScreen::menu(texts::TRY_AGAIN, admin_channels_keyboard())
            }
        },
        AdminCallback::RefreshChannels => match deps.orchestrator.refresh_bot_admin_flags().await {
            Ok(count) => AdminScreen::menu(
                format!("🔄 Bot admin flags refreshed. The bot is admin in {} channel(s).", count),
                admin_channels_keyboard(),
            ),
            Err(e) => {
                log::error!("Failed to refresh bot admin flags: {}", e);
                AdminScreen::menu(texts::TRY_AGAIN, admin_channels_keyboard())
            }
        },
        AdminCallback::ListTokens => match deps.ledger.list_tokens() {
            Ok(tokens) => AdminScreen::menu(texts::token_list(&tokens), admin_tokens_keyboard()),
            Err(e) => {
                log::error!("Failed to list reward codes: {}", e);
                AdminScreen::menu(texts::TRY_AGAIN, admin_tokens_keyboard())
            }
        },
    }
}

fn parse_id(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Applies the admin's text input to `action` and returns the reply
pub async fn run_admin_action(deps: &HandlerDeps, action: AdminAction, text: &str) -> String {
    let text = text.trim();
    log::info!("Running admin action {}", action);

    match action {
        AdminAction::AddChannel => {
            let channel = match NewChannel::parse_admin_form(text, Utc::now()) {
                Ok(channel) => channel,
                Err(AppError::Validation(reason)) => {
                    return format!("Wrong format ({}). Use: link|title|max|order|hours", reason);
                }
                Err(e) => return format!("Wrong format: {}", e),
            };
            match deps.orchestrator.register_channel(channel).await {
                Ok(registered) => match deps.registry.get(registered.id) {
                    Ok(Some(channel)) => texts::channel_added(&channel),
                    Ok(None) => texts::TRY_AGAIN.to_string(),
                    Err(e) => {
                        log::error!("Failed to reload channel {}: {}", registered.id, e);
                        texts::TRY_AGAIN.to_string()
                    }
                },
                Err(AppError::DuplicateIdentifier(identifier)) => {
                    format!("Channel {} is already registered.", teloxide::utils::html::escape(&identifier))
                }
                Err(e) => {
                    log::error!("Failed to register channel: {}", e);
                    texts::TRY_AGAIN.to_string()
                }
            }
        }
        AdminAction::RemoveChannel => {
            let Some(id) = parse_id(text) else {
                return texts::ID_NOT_A_NUMBER.to_string();
            };
            match deps.registry.remove(id) {
                Ok(()) => format!("Channel id={} removed.", id),
                Err(e) => {
                    log::error!("Failed to remove channel {}: {}", id, e);
                    texts::TRY_AGAIN.to_string()
                }
            }
        }
        AdminAction::AddToken => match deps.ledger.add_token(text) {
            Ok(id) => format!("✅ Reward code added (id={}).", id),
            Err(AppError::Validation(_)) => "The code text is empty.".to_string(),
            Err(e) => {
                log::error!("Failed to add reward code: {}", e);
                texts::TRY_AGAIN.to_string()
            }
        },
        AdminAction::RemoveToken => {
            let Some(id) = parse_id(text) else {
                return texts::ID_NOT_A_NUMBER.to_string();
            };
            match deps.ledger.remove_token(id) {
                Ok(()) => format!("Reward code id={} removed.", id),
                Err(e) => {
                    log::error!("Failed to remove reward code {}: {}", id, e);
                    texts::TRY_AGAIN.to_string()
                }
            }
        }
        AdminAction::BroadcastUsers => {
            let user_ids = match deps.users.list_ids() {
                Ok(ids) => ids,
                Err(e) => {
                    log::error!("Failed to load users for broadcast: {}", e);
                    return texts::TRY_AGAIN.to_string();
                }
            };
            if user_ids.is_empty() {
                return "No users yet.".to_string();
            }
            let report = broadcast_to_users(
                deps.platform.as_ref(),
                &user_ids,
                text,
                config::broadcast::user_delay(),
            )
            .await;
            texts::broadcast_done(report.sent, report.failed, "users")
        }
        AdminAction::BroadcastChannels => {
            let channels: Vec<String> = match deps.registry.list_bot_admin() {
                Ok(channels) => channels.into_iter().map(|c| c.identifier).collect(),
                Err(e) => {
                    log::error!("Failed to load channels for broadcast: {}", e);
                    return texts::TRY_AGAIN.to_string();
                }
            };
            if channels.is_empty() {
                return "The bot is not admin in any channel.".to_string();
            }
            let report = broadcast_to_channels(
                deps.platform.as_ref(),
                &channels,
                text,
                config::broadcast::channel_delay(),
            )
            .await;
            texts::broadcast_done(report.sent, report.failed, "channels")
        }
    }
}
