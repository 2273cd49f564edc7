//! Inline keyboards and callback data
//!
//! Callback data strings are the contract between the keyboards built here
//! and `CallbackAction::parse` in the callback handler.

use strum::{AsRefStr, EnumString};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use sponsorcore::config;
use sponsorcore::{Channel, MissingChannel};

pub const CONFIRM_SUBSCRIPTION: &str = "confirm_subs";
const CHANNEL_PREFIX: &str = "chan:";

/// Admin panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
pub enum AdminCallback {
    #[strum(to_string = "adm_open", serialize = "admin_panel")]
    Open,
    #[strum(serialize = "adm_close")]
    Close,
    #[strum(serialize = "adm_channels")]
    Channels,
    #[strum(serialize = "adm_tokens")]
    Tokens,
    #[strum(serialize = "adm_stats")]
    Stats,
    #[strum(serialize = "adm_broadcast_users")]
    BroadcastUsers,
    #[strum(serialize = "adm_broadcast_channels")]
    BroadcastChannels,
    #[strum(serialize = "adm_add_channel")]
    AddChannel,
    #[strum(serialize = "adm_remove_channel")]
    RemoveChannel,
    #[strum(serialize = "adm_list_channels")]
    ListChannels,
    #[strum(serialize = "adm_refresh_channels")]
    RefreshChannels,
    #[strum(serialize = "adm_add_token")]
    AddToken,
    #[strum(serialize = "adm_remove_token")]
    RemoveToken,
    #[strum(serialize = "adm_list_tokens")]
    ListTokens,
}

/// Parsed callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    ConfirmSubscription,
    ChannelDetails(i64),
    Admin(AdminCallback),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data == CONFIRM_SUBSCRIPTION {
            return Some(CallbackAction::ConfirmSubscription);
        }
        if let Some(id) = data.strip_prefix(CHANNEL_PREFIX) {
            return id.parse().ok().map(CallbackAction::ChannelDetails);
        }
        data.parse().ok().map(CallbackAction::Admin)
    }
}

fn callback(text: impl Into<String>, data: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, data)
}

fn confirm_row() -> Vec<InlineKeyboardButton> {
    vec![callback("✅ I joined", CONFIRM_SUBSCRIPTION)]
}

fn channel_rows(buttons: Vec<InlineKeyboardButton>) -> Vec<Vec<InlineKeyboardButton>> {
    buttons
        .chunks(config::channels::BUTTONS_PER_ROW)
        .map(<[InlineKeyboardButton]>::to_vec)
        .collect()
}

/// One button per channel (two per row) plus the confirm button
pub fn channels_keyboard(channels: &[Channel]) -> InlineKeyboardMarkup {
    let buttons = channels
        .iter()
        .map(|channel| callback(format!("🔔 {}", channel.title), format!("{}{}", CHANNEL_PREFIX, channel.id)))
        .collect();
    let mut rows = channel_rows(buttons);
    rows.push(confirm_row());
    InlineKeyboardMarkup::new(rows)
}

/// Same layout as `channels_keyboard`, limited to the channels still missing
pub fn missing_channels_keyboard(missing: &[MissingChannel]) -> InlineKeyboardMarkup {
    let buttons = missing
        .iter()
        .map(|channel| callback(format!("🔔 {}", channel.title), format!("{}{}", CHANNEL_PREFIX, channel.id)))
        .collect();
    let mut rows = channel_rows(buttons);
    rows.push(confirm_row());
    InlineKeyboardMarkup::new(rows)
}

/// Open-link button for public channels, always followed by the confirm button
pub fn channel_details_keyboard(channel: &Channel) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(link) = channel.public_link().and_then(|link| url::Url::parse(&link).ok()) {
        rows.push(vec![InlineKeyboardButton::url(format!("➡️ Open {}", channel.title), link)]);
    }
    rows.push(confirm_row());
    InlineKeyboardMarkup::new(rows)
}

fn admin_button(text: &str, action: AdminCallback) -> Vec<InlineKeyboardButton> {
    vec![callback(text, action.as_ref())]
}

pub fn admin_panel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        admin_button("📢 Channels", AdminCallback::Channels),
        admin_button("🔑 Reward codes", AdminCallback::Tokens),
        admin_button("📊 Statistics", AdminCallback::Stats),
        admin_button("📬 Message users", AdminCallback::BroadcastUsers),
        admin_button("📡 Post to channels (bot admin)", AdminCallback::BroadcastChannels),
        admin_button("❌ Close", AdminCallback::Close),
    ])
}

pub fn admin_channels_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        admin_button("➕ Add channel", AdminCallback::AddChannel),
        admin_button("➖ Remove channel", AdminCallback::RemoveChannel),
        admin_button("📋 List channels", AdminCallback::ListChannels),
        admin_button("🔄 Refresh bot admin flags", AdminCallback::RefreshChannels),
        admin_button("⬅️ Back", AdminCallback::Open),
    ])
}

pub fn admin_tokens_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        admin_button("➕ Add code", AdminCallback::AddToken),
        admin_button("➖ Remove code", AdminCallback::RemoveToken),
        admin_button("📋 List codes", AdminCallback::ListTokens),
        admin_button("⬅️ Back", AdminCallback::Open),
    ])
}

/// Single back-to-panel button under admin listings
pub fn admin_back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![admin_button("⬅️ Back", AdminCallback::Open)])
}
