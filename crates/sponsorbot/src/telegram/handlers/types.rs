//! Handler types, dependencies, and user tracking helpers

use std::sync::Arc;

use dashmap::DashMap;
use strum::{AsRefStr, Display};
use teloxide::types::{Message, User};

use sponsorcore::{
    ChannelRegistry, DbPool, MembershipVerifier, MessagingPlatform, RewardLedger, UserDirectory,
    VerificationOrchestrator,
};

use crate::telegram::texts;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The next plain-text message from an admin is input for this action
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AdminAction {
    AddChannel,
    RemoveChannel,
    AddToken,
    RemoveToken,
    BroadcastUsers,
    BroadcastChannels,
}

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub registry: ChannelRegistry,
    pub ledger: RewardLedger,
    pub users: UserDirectory,
    pub orchestrator: VerificationOrchestrator,
    pub platform: Arc<dyn MessagingPlatform>,
    /// Pending admin dialogue per admin user id, wherever the admin talks to the bot
    pub admin_sessions: Arc<DashMap<i64, AdminAction>>,
    pub bot_username: Option<String>,
}

impl HandlerDeps {
    /// Wires every core component on top of one pool and one platform
    pub fn new(db_pool: Arc<DbPool>, platform: Arc<dyn MessagingPlatform>, bot_username: Option<String>) -> Self {
        let registry = ChannelRegistry::new(Arc::clone(&db_pool));
        let ledger = RewardLedger::new(Arc::clone(&db_pool));
        let users = UserDirectory::new(Arc::clone(&db_pool));
        let verifier = MembershipVerifier::from_config(Arc::clone(&platform));
        let orchestrator =
            VerificationOrchestrator::new(registry.clone(), ledger.clone(), verifier, Arc::clone(&platform))
                .with_reward_formatter(texts::reward_message);

        Self {
            db_pool,
            registry,
            ledger,
            users,
            orchestrator,
            platform,
            admin_sessions: Arc::new(DashMap::new()),
            bot_username,
        }
    }

    pub fn set_admin_action(&self, admin_id: i64, action: AdminAction) {
        self.admin_sessions.insert(admin_id, action);
    }

    /// Removes and returns the pending action, so each prompt is answered once
    pub fn take_admin_action(&self, admin_id: i64) -> Option<AdminAction> {
        self.admin_sessions.remove(&admin_id).map(|(_, action)| action)
    }

    pub fn clear_admin_action(&self, admin_id: i64) {
        self.admin_sessions.remove(&admin_id);
    }

    pub fn has_admin_action(&self, admin_id: i64) -> bool {
        self.admin_sessions.contains_key(&admin_id)
    }
}

/// Telegram user id as stored in the database
pub fn user_id_of(user: &User) -> i64 {
    i64::try_from(user.id.0).unwrap_or(0)
}

/// User id of the message sender, the key of admin sessions
pub fn sender_id_of(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(user_id_of)
}

pub fn display_name_of(user: &User) -> String {
    let full = user.full_name();
    if full.trim().is_empty() {
        user.username.clone().unwrap_or_else(|| user.id.0.to_string())
    } else {
        full
    }
}

/// Upserts the profile of the sender. Failures are logged, never returned.
pub fn track_user(deps: &HandlerDeps, user: &User) {
    if let Err(e) = deps
        .users
        .touch(user_id_of(user), user.username.as_deref(), &display_name_of(user))
    {
        log::error!("Failed to record user {}: {}", user.id.0, e);
    }
}
