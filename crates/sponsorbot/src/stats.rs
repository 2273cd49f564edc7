//! Aggregate numbers shown in the admin panel and by `sponsorbot stats`

use chrono::Utc;
use indoc::formatdoc;
use serde::Serialize;
use sponsorcore::{AppResult, ChannelRegistry, RewardLedger, UserDirectory};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BotStats {
    pub users: u64,
    pub channels: u64,
    pub active_channels: u64,
    pub tokens: u64,
    pub dispensed: u64,
    pub rewarded_users: u64,
}

impl BotStats {
    pub fn collect(registry: &ChannelRegistry, ledger: &RewardLedger, users: &UserDirectory) -> AppResult<Self> {
        let ledger_stats = ledger.stats()?;
        Ok(Self {
            users: users.count()?,
            channels: registry.count()?,
            active_channels: registry.list_active(Utc::now())?.len() as u64,
            tokens: ledger_stats.tokens,
            dispensed: ledger_stats.dispensed,
            rewarded_users: ledger_stats.rewarded_users,
        })
    }

    /// Plain text block, safe to send with HTML parse mode.
    pub fn render(&self) -> String {
        formatdoc! {"
            📊 Statistics
            • Users: {users}
            • Channels: {channels} ({active} active)
            • Reward codes: {tokens}
            • Codes handed out: {dispensed} to {rewarded} users",
            users = self.users,
            channels = self.channels,
            active = self.active_channels,
            tokens = self.tokens,
            dispensed = self.dispensed,
            rewarded = self.rewarded_users,
        }
    }
}
