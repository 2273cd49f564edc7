//! Telegram implementation of the messaging platform seam

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberStatus, ParseMode, Recipient};
use teloxide::{ApiError, RequestError};

use sponsorcore::{MembershipStatus, MessagingPlatform, PlatformError};

use crate::telegram::Bot;

/// Turns a stored channel identifier into a Bot API recipient.
///
/// Numeric ids (`-1001234567890`) become chat ids, everything else is
/// treated as a public `@username`.
pub fn recipient_for(identifier: &str) -> Recipient {
    match identifier.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => {
            let name = identifier.trim();
            if name.starts_with('@') {
                Recipient::ChannelUsername(name.to_string())
            } else {
                Recipient::ChannelUsername(format!("@{}", name))
            }
        }
    }
}

pub fn map_member_status(status: ChatMemberStatus) -> MembershipStatus {
    match status {
        ChatMemberStatus::Owner => MembershipStatus::Creator,
        ChatMemberStatus::Administrator => MembershipStatus::Administrator,
        ChatMemberStatus::Member => MembershipStatus::Member,
        ChatMemberStatus::Restricted => MembershipStatus::Restricted,
        ChatMemberStatus::Left => MembershipStatus::Left,
        ChatMemberStatus::Banned => MembershipStatus::Kicked,
    }
}

fn map_request_error(err: RequestError) -> PlatformError {
    match err {
        RequestError::Api(ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::CantInitiateConversation) => {
            PlatformError::Unreachable(err.to_string())
        }
        RequestError::Network(_) | RequestError::Io(_) => PlatformError::Network(err.to_string()),
        other => PlatformError::Rejected(other.to_string()),
    }
}

/// `MessagingPlatform` backed by the Bot API.
///
/// Holds the bot's own user id so admin checks need no extra `getMe` call.
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
    bot_id: UserId,
}

impl TelegramPlatform {
    pub fn new(bot: Bot, bot_id: UserId) -> Self {
        Self { bot, bot_id }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    async fn member_status(&self, channel: &str, user_id: UserId) -> Result<MembershipStatus, PlatformError> {
        let member = self
            .bot
            .get_chat_member(recipient_for(channel), user_id)
            .await
            .map_err(map_request_error)?;
        Ok(map_member_status(member.kind.status()))
    }
}

#[async_trait]
impl MessagingPlatform for TelegramPlatform {
    async fn membership_status(&self, channel: &str, user_id: i64) -> Result<MembershipStatus, PlatformError> {
        let Ok(user_id) = u64::try_from(user_id) else {
            return Ok(MembershipStatus::Unknown);
        };
        self.member_status(channel, UserId(user_id)).await
    }

    async fn self_admin_status(&self, channel: &str) -> Result<bool, PlatformError> {
        let status = self.member_status(channel, self.bot_id).await?;
        Ok(status.is_admin())
    }

    async fn send_direct_message(&self, user_id: i64, text: &str) -> Result<(), PlatformError> {
        self.bot
            .send_message(ChatId(user_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn send_channel_message(&self, channel: &str, text: &str) -> Result<(), PlatformError> {
        self.bot
            .send_message(recipient_for(channel), text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_for_identifiers() {
        assert_eq!(recipient_for("-1001234567890"), Recipient::Id(ChatId(-1001234567890)));
        assert_eq!(
            recipient_for("@sponsor"),
            Recipient::ChannelUsername("@sponsor".to_string())
        );
        assert_eq!(
            recipient_for("sponsor"),
            Recipient::ChannelUsername("@sponsor".to_string())
        );
    }

    #[test]
    fn test_member_status_mapping() {
        assert!(map_member_status(ChatMemberStatus::Owner).is_admin());
        assert!(map_member_status(ChatMemberStatus::Restricted).is_member());
        assert!(!map_member_status(ChatMemberStatus::Left).is_member());
        assert_eq!(map_member_status(ChatMemberStatus::Banned), MembershipStatus::Kicked);
    }

    #[test]
    fn test_blocked_user_is_unreachable() {
        assert!(matches!(
            map_request_error(RequestError::Api(ApiError::BotBlocked)),
            PlatformError::Unreachable(_)
        ));
        assert!(matches!(
            map_request_error(RequestError::Api(ApiError::ChatNotFound)),
            PlatformError::Rejected(_)
        ));
    }
}
