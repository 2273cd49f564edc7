//! The messaging platform seam.
//!
//! Everything the core needs from the outside world goes through
//! `MessagingPlatform`. The bot crate implements it on top of teloxide;
//! tests implement it with in-memory fakes. This module has zero teloxide
//! dependency.

use async_trait::async_trait;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Membership status of a user in a channel, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MembershipStatus {
    Member,
    Administrator,
    Creator,
    Restricted,
    Left,
    Kicked,
    Unknown,
}

impl MembershipStatus {
    /// `Left`, `Kicked` and `Unknown` mean "not a member", everything else counts.
    pub fn is_member(&self) -> bool {
        !matches!(
            self,
            MembershipStatus::Left | MembershipStatus::Kicked | MembershipStatus::Unknown
        )
    }

    /// Whether this status grants administrative rights in the channel
    pub fn is_admin(&self) -> bool {
        matches!(self, MembershipStatus::Administrator | MembershipStatus::Creator)
    }
}

/// Failure of a single platform call.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// The platform answered with an error (chat not found, bot not in chat, ...)
    #[error("platform rejected the call: {0}")]
    Rejected(String),

    /// The call never reached the platform or the response was lost
    #[error("network error: {0}")]
    Network(String),

    /// The target user has blocked the bot or never started it
    #[error("recipient unreachable: {0}")]
    Unreachable(String),
}

/// Operations the core consumes from the messaging platform.
///
/// All methods take `&self`; implementations are stateless or use interior
/// mutability. Callers wrap every call in a timeout.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// Membership status of `user_id` in `channel` (`@handle` or numeric chat id).
    async fn membership_status(&self, channel: &str, user_id: i64) -> Result<MembershipStatus, PlatformError>;

    /// Whether the bot itself holds administrative rights in `channel`.
    async fn self_admin_status(&self, channel: &str) -> Result<bool, PlatformError>;

    /// Sends a private message to a user.
    async fn send_direct_message(&self, user_id: i64, text: &str) -> Result<(), PlatformError>;

    /// Posts a message to a channel the bot administers.
    async fn send_channel_message(&self, channel: &str, text: &str) -> Result<(), PlatformError>;
}
