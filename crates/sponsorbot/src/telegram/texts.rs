//! User-facing message texts
//!
//! Everything here is sent with HTML parse mode, so every dynamic value goes
//! through `teloxide::utils::html::escape`.

use chrono::{DateTime, Utc};
use indoc::formatdoc;
use teloxide::utils::html::escape;

use sponsorcore::{Channel, ConfirmOutcome, DeliveryFailure, MissingChannel, RewardToken};

/// Maximum message length for Telegram (with margin)
const MAX_MESSAGE_LENGTH: usize = 4000;

pub const NO_CHANNELS: &str = "👋 Hello! No channels are configured right now, please come back later.";
pub const TRY_AGAIN: &str = "⚠️ Something went wrong on our side. Please try again in a minute.";
pub const NOT_ADMIN: &str = "❌ You are not allowed to use the admin panel.";
pub const ADMIN_PANEL: &str = "🛠️ Admin panel:";
pub const ADMIN_CLOSED: &str = "✅ Admin panel closed.";
pub const CHANNELS_MENU: &str = "📢 Channels:";
pub const TOKENS_MENU: &str = "🔑 Reward codes:";
pub const ASK_CHANNEL_FORM: &str = "📥 Send the channel as\n\nlink|title|max|order|hours\n\nExample:\nhttps://t.me/mychannel|My channel|max|1|24";
pub const ASK_CHANNEL_ID: &str = "📥 Send the ID of the channel to remove.";
pub const ASK_TOKEN_TEXT: &str = "📥 Send the text of the new reward code.";
pub const ASK_TOKEN_ID: &str = "📥 Send the ID of the reward code to remove.";
pub const ASK_BROADCAST_USERS: &str = "✍️ Send the message to deliver to every user.";
pub const ASK_BROADCAST_CHANNELS: &str = "✍️ Send the message to post in every channel where the bot is admin.";
pub const ID_NOT_A_NUMBER: &str = "The ID must be a number.";

const TRUNCATED_MARKER: &str = "\n... (truncated)";

/// Longest payload shown in the admin code list, in chars
const PAYLOAD_PREVIEW_CHARS: usize = 1000;

/// Joins already rendered HTML rows under `header`, keeping only whole rows
/// within Telegram's message limit so no tag or entity is ever cut.
pub fn join_rows(header: &str, rows: &[String]) -> String {
    let budget = MAX_MESSAGE_LENGTH - TRUNCATED_MARKER.len();
    let mut text = header.to_string();
    for (shown, row) in rows.iter().enumerate() {
        if text.len() + 1 + row.len() > budget {
            log::debug!("Message cut after {} of {} rows", shown, rows.len());
            text.push_str(TRUNCATED_MARKER);
            return text;
        }
        text.push('\n');
        text.push_str(row);
    }
    text
}

fn payload_preview(payload: &str) -> String {
    if payload.chars().count() <= PAYLOAD_PREVIEW_CHARS {
        return payload.to_string();
    }
    let mut preview: String = payload.chars().take(PAYLOAD_PREVIEW_CHARS).collect();
    preview.push('…');
    preview
}

/// Greeting shown on /start above the channel buttons
pub fn welcome(name: &str, bot_username: Option<&str>) -> String {
    let bot_line = bot_username
        .map(|username| format!("🤖 Welcome to @{}.\n", escape(username)))
        .unwrap_or_default();
    formatdoc! {"
        👋 Hello <b>{name}</b>!
        {bot_line}
        🔑 To get a VPN code, join the channels below:
        1️⃣ Open each channel and join it.
        2️⃣ Then press <b>I joined</b>.

        📌 Once you are in every channel, the bot sends you the latest code.",
        name = escape(name),
        bot_line = bot_line,
    }
}

/// The private message carrying the reward
pub fn reward_message(payload: &str) -> String {
    format!("🎉 Congratulations! ✅\n\n🔑 Your VPN code:\n<code>{}</code>", escape(payload))
}

fn missing_lines(missing: &[MissingChannel]) -> String {
    missing
        .iter()
        .map(|channel| format!("➡️ {} ({})", escape(&channel.title), escape(&channel.identifier)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text for the message the "I joined" button belongs to
pub fn confirm_outcome(outcome: &ConfirmOutcome) -> String {
    match outcome {
        ConfirmOutcome::Incomplete { missing } => formatdoc! {"
            ⚠️ You have not joined every channel yet!
            📌 Still missing:
            {lines}

            🔁 Join them and press the button again.",
            lines = missing_lines(missing),
        },
        ConfirmOutcome::NoRewardAvailable => {
            "🎉 You joined every channel.\n\n🔑 There is no code available right now, please check back later."
                .to_string()
        }
        ConfirmOutcome::Dispensed { .. } => "✅ Your VPN code was sent to you in a private message.".to_string(),
        ConfirmOutcome::AlreadyDispensed { token } => {
            format!(
                "✅ You already received the current code:\n<code>{}</code>",
                escape(&token.payload)
            )
        }
        ConfirmOutcome::DeliveryFailed {
            reason: DeliveryFailure::SendFailed,
        } => "⚠️ Could not send you the code. Make sure you started the bot and did not block it, then try again."
            .to_string(),
        ConfirmOutcome::DeliveryFailed {
            reason: DeliveryFailure::TokenWithdrawn,
        } => "⚠️ The code was just replaced. Please press the button again.".to_string(),
    }
}

/// Details of one channel, shown from the `chan:<id>` button
pub fn channel_details(channel: &Channel) -> String {
    let mut text = format!(
        "📢 <b>{}</b>\nLink: {}\n\n➡️ Join the channel, come back and press <b>I joined ✅</b>.",
        escape(&channel.title),
        escape(&channel.identifier)
    );
    if let Some(link) = channel.public_link() {
        text.push_str(&format!("\n\n🔗 {}", escape(&link)));
    }
    text
}

fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// Admin listing of all channels
pub fn channel_list(channels: &[Channel]) -> String {
    if channels.is_empty() {
        return "No channels registered.".to_string();
    }
    let mut rows = Vec::with_capacity(channels.len());
    for channel in channels {
        let cap = channel
            .max_subscribers
            .map(|cap| cap.to_string())
            .unwrap_or_else(|| "max".to_string());
        rows.push(format!(
            "ID:{} | {} | {} | max:{} | order:{} | until:{} | bot_admin:{} | subs:{}",
            channel.id,
            escape(&channel.title),
            escape(&channel.identifier),
            cap,
            channel.order_key,
            format_timestamp(channel.expires_at),
            if channel.bot_admin { "yes" } else { "no" },
            channel.subscriber_count
        ));
    }
    join_rows("📋 Channels:", &rows)
}

/// Admin listing of all reward codes
pub fn token_list(tokens: &[RewardToken]) -> String {
    if tokens.is_empty() {
        return "No reward codes yet.".to_string();
    }
    let rows: Vec<String> = tokens
        .iter()
        .map(|token| {
            format!(
                "ID:{} | sent:{} | created:{}\n<code>{}</code>\n---",
                token.id,
                token.sent_count,
                format_timestamp(Some(token.created_at)),
                escape(&payload_preview(&token.payload))
            )
        })
        .collect();
    join_rows("📦 Reward codes:", &rows)
}

pub fn channel_added(channel: &Channel) -> String {
    format!(
        "Channel added: {} ({})\nBot admin: {}",
        escape(&channel.title),
        escape(&channel.identifier),
        if channel.bot_admin { "yes" } else { "no" }
    )
}

pub fn broadcast_done(sent: usize, failed: usize, target: &str) -> String {
    if failed == 0 {
        format!("Delivered to {} {}.", sent, target)
    } else {
        format!("Delivered to {} {}, {} failed.", sent, target, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(payload: &str) -> RewardToken {
        RewardToken {
            id: 3,
            payload: payload.to_string(),
            created_at: DateTime::<Utc>::default(),
            sent_count: 4,
        }
    }

    fn channel(identifier: &str, title: &str) -> Channel {
        Channel {
            id: 9,
            identifier: identifier.to_string(),
            title: title.to_string(),
            order_key: 1,
            expires_at: None,
            max_subscribers: Some(50),
            bot_admin: true,
            subscriber_count: 12,
        }
    }

    #[test]
    fn test_welcome_escapes_name() {
        let text = welcome("<Eve & Co>", Some("sponsor_bot"));
        assert!(text.contains("<b>&lt;Eve &amp; Co&gt;</b>"));
        assert!(text.contains("@sponsor_bot"));
    }

    #[test]
    fn test_incomplete_lists_missing_channels() {
        let outcome = ConfirmOutcome::Incomplete {
            missing: vec![
                MissingChannel {
                    id: 1,
                    identifier: "@alpha".to_string(),
                    title: "Alpha".to_string(),
                },
                MissingChannel {
                    id: 2,
                    identifier: "-100123".to_string(),
                    title: "Beta <news>".to_string(),
                },
            ],
        };
        let text = confirm_outcome(&outcome);
        assert!(text.contains("➡️ Alpha (@alpha)\n➡️ Beta &lt;news&gt; (-100123)"));
    }

    #[test]
    fn test_already_dispensed_shows_code() {
        let text = confirm_outcome(&ConfirmOutcome::AlreadyDispensed { token: token("A<B") });
        assert!(text.contains("<code>A&lt;B</code>"));
    }

    #[test]
    fn test_reward_message_escapes_payload() {
        assert_eq!(
            reward_message("vless://x?a=1&b=2"),
            "🎉 Congratulations! ✅\n\n🔑 Your VPN code:\n<code>vless://x?a=1&amp;b=2</code>"
        );
    }

    #[test]
    fn test_channel_details_link() {
        let text = channel_details(&channel("@alpha", "Alpha"));
        assert!(text.contains("🔗 https://t.me/alpha"));
        let text = channel_details(&channel("-100123", "Private"));
        assert!(!text.contains("t.me"));
    }

    #[test]
    fn test_channel_list_row() {
        let text = channel_list(&[channel("@alpha", "Alpha")]);
        assert_eq!(
            text,
            "📋 Channels:\nID:9 | Alpha | @alpha | max:50 | order:1 | until:never | bot_admin:yes | subs:12"
        );
    }

    #[test]
    fn test_token_list_keeps_code_tags_balanced() {
        let tokens: Vec<RewardToken> = (1..=3)
            .map(|id| RewardToken {
                id,
                ..token(&"a&b".repeat(502))
            })
            .collect();

        let text = token_list(&tokens);
        assert!(text.len() <= MAX_MESSAGE_LENGTH);
        assert!(text.ends_with("(truncated)"));
        assert_eq!(text.matches("<code>").count(), text.matches("</code>").count());
        assert!(text.matches("<code>").count() >= 1);
    }

    #[test]
    fn test_token_list_previews_oversized_payload() {
        let text = token_list(&[token(&"<x>".repeat(2000))]);
        assert!(text.len() <= MAX_MESSAGE_LENGTH);
        assert_eq!(text.matches("<code>").count(), 1);
        assert_eq!(text.matches("</code>").count(), 1);
        assert!(text.contains("…</code>"));
    }

    #[test]
    fn test_join_rows_cuts_between_rows() {
        let rows: Vec<String> = (0..200).map(|i| format!("<b>row {i}</b> {}", "é".repeat(20))).collect();
        let text = join_rows("Header", &rows);

        assert!(text.len() <= MAX_MESSAGE_LENGTH);
        let body = text.strip_suffix(TRUNCATED_MARKER).unwrap();
        assert!(body.lines().skip(1).all(|line| line.starts_with("<b>row ") && line.ends_with('é')));

        assert_eq!(join_rows("Header", &rows[..2]), format!("Header\n{}\n{}", rows[0], rows[1]));
    }

    #[test]
    fn test_broadcast_done() {
        assert_eq!(broadcast_done(3, 0, "users"), "Delivered to 3 users.");
        assert_eq!(broadcast_done(3, 1, "channels"), "Delivered to 3 channels, 1 failed.");
    }
}
