//! In-memory messaging platform with scripted answers

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sponsorcore::{MembershipStatus, MessagingPlatform, PlatformError};

/// Runs inside `send_direct_message`, before the message is recorded
pub type DirectMessageHook = Box<dyn Fn(i64) + Send + Sync>;

/// Answers membership queries from a table and records every DM.
///
/// Unknown (channel, user) pairs answer `Left`.
#[derive(Default)]
pub struct MockPlatform {
    statuses: HashMap<(String, i64), MembershipStatus>,
    failing_channels: HashSet<String>,
    stalling_channels: HashSet<String>,
    admin_channels: HashSet<String>,
    fail_direct_messages: bool,
    stall_direct_messages: bool,
    direct_message_hook: Mutex<Option<DirectMessageHook>>,
    sent: Mutex<Vec<(i64, String)>>,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, channel: &str, user_id: i64, status: MembershipStatus) -> Self {
        self.statuses.insert((channel.to_string(), user_id), status);
        self
    }

    pub fn with_member(self, channel: &str, user_id: i64) -> Self {
        self.with_status(channel, user_id, MembershipStatus::Member)
    }

    /// Every membership query for `channel` returns a platform error
    pub fn with_failing_channel(mut self, channel: &str) -> Self {
        self.failing_channels.insert(channel.to_string());
        self
    }

    /// Every membership query for `channel` hangs far past any timeout
    pub fn with_stalling_channel(mut self, channel: &str) -> Self {
        self.stalling_channels.insert(channel.to_string());
        self
    }

    pub fn with_admin_channel(mut self, channel: &str) -> Self {
        self.admin_channels.insert(channel.to_string());
        self
    }

    pub fn with_failing_direct_messages(mut self) -> Self {
        self.fail_direct_messages = true;
        self
    }

    /// Every DM hangs far past any timeout
    pub fn with_stalling_direct_messages(mut self) -> Self {
        self.stall_direct_messages = true;
        self
    }

    /// Installs `hook` on an already shared platform
    pub fn set_direct_message_hook(&self, hook: impl Fn(i64) + Send + Sync + 'static) {
        *self.direct_message_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn sent_messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPlatform for MockPlatform {
    async fn membership_status(&self, channel: &str, user_id: i64) -> Result<MembershipStatus, PlatformError> {
        if self.stalling_channels.contains(channel) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing_channels.contains(channel) {
            return Err(PlatformError::Rejected(format!("bot cannot see members of {}", channel)));
        }
        Ok(self
            .statuses
            .get(&(channel.to_string(), user_id))
            .copied()
            .unwrap_or(MembershipStatus::Left))
    }

    async fn self_admin_status(&self, channel: &str) -> Result<bool, PlatformError> {
        Ok(self.admin_channels.contains(channel))
    }

    async fn send_direct_message(&self, user_id: i64, text: &str) -> Result<(), PlatformError> {
        if self.stall_direct_messages {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_direct_messages {
            return Err(PlatformError::Unreachable(format!("user {} blocked the bot", user_id)));
        }
        if let Some(hook) = self.direct_message_hook.lock().unwrap().as_ref() {
            hook(user_id);
        }
        self.sent.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }

    async fn send_channel_message(&self, _channel: &str, _text: &str) -> Result<(), PlatformError> {
        Ok(())
    }
}
