//! Shared fixtures for the bot integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use sponsorbot::HandlerDeps;
use sponsorcore::{create_pool, MembershipStatus, MessagingPlatform, PlatformError};

/// Platform fake: the bot is admin in `admin_channels`, users in `members` are
/// members everywhere, users in `blocked` cannot be messaged.
#[derive(Default)]
pub struct FakePlatform {
    pub admin_channels: HashSet<String>,
    pub members: HashSet<i64>,
    pub blocked: HashSet<i64>,
    pub direct: Mutex<Vec<(i64, String)>>,
    pub posts: Mutex<Vec<(String, String)>>,
}

impl FakePlatform {
    pub fn with_admin_channel(mut self, channel: &str) -> Self {
        self.admin_channels.insert(channel.to_string());
        self
    }

    pub fn with_member(mut self, user_id: i64) -> Self {
        self.members.insert(user_id);
        self
    }

    pub fn with_blocked_user(mut self, user_id: i64) -> Self {
        self.blocked.insert(user_id);
        self
    }

    pub fn direct_messages(&self) -> Vec<(i64, String)> {
        self.direct.lock().unwrap().clone()
    }

    pub fn channel_posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPlatform for FakePlatform {
    async fn membership_status(&self, _channel: &str, user_id: i64) -> Result<MembershipStatus, PlatformError> {
        if self.members.contains(&user_id) {
            Ok(MembershipStatus::Member)
        } else {
            Ok(MembershipStatus::Left)
        }
    }

    async fn self_admin_status(&self, channel: &str) -> Result<bool, PlatformError> {
        Ok(self.admin_channels.contains(channel))
    }

    async fn send_direct_message(&self, user_id: i64, text: &str) -> Result<(), PlatformError> {
        if self.blocked.contains(&user_id) {
            return Err(PlatformError::Unreachable("bot was blocked by the user".to_string()));
        }
        self.direct.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }

    async fn send_channel_message(&self, channel: &str, text: &str) -> Result<(), PlatformError> {
        if !self.admin_channels.contains(channel) {
            return Err(PlatformError::Rejected("not enough rights".to_string()));
        }
        self.posts.lock().unwrap().push((channel.to_string(), text.to_string()));
        Ok(())
    }
}

/// Handler dependencies on a fresh database in a temp dir
pub struct BotEnvironment {
    _dir: TempDir,
    pub deps: HandlerDeps,
    pub platform: Arc<FakePlatform>,
}

impl BotEnvironment {
    pub fn new(platform: FakePlatform) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sponsor.db");
        let pool = Arc::new(create_pool(path.to_str().unwrap()).unwrap());
        let platform = Arc::new(platform);
        let deps = HandlerDeps::new(pool, platform.clone(), Some("sponsor_test_bot".to_string()));

        Self {
            _dir: dir,
            deps,
            platform,
        }
    }
}
