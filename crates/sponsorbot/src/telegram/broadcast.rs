//! Broadcast fan-out to users and to channels the bot administers
//!
//! Targets are sent to one at a time with a fixed delay in between so a
//! large audience does not trip the Bot API flood limits. A failure for one
//! target is logged and counted, never fatal.

use std::time::Duration;

use teloxide::utils::html::escape;

use sponsorcore::MessagingPlatform;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends `text` (escaped, sent as HTML) privately to every user id.
pub async fn broadcast_to_users(
    platform: &dyn MessagingPlatform,
    user_ids: &[i64],
    text: &str,
    delay: Duration,
) -> BroadcastReport {
    let safe_text = escape(text);
    let mut report = BroadcastReport::default();

    for (i, user_id) in user_ids.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match platform.send_direct_message(*user_id, &safe_text).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                log::warn!("Broadcast to user {} failed: {}", user_id, e);
                report.failed += 1;
            }
        }
    }

    log::info!(
        "User broadcast finished: {} sent, {} failed",
        report.sent,
        report.failed
    );
    report
}

/// Posts `text` (escaped, sent as HTML) to every channel identifier.
pub async fn broadcast_to_channels(
    platform: &dyn MessagingPlatform,
    channels: &[String],
    text: &str,
    delay: Duration,
) -> BroadcastReport {
    let safe_text = escape(text);
    let mut report = BroadcastReport::default();

    for (i, channel) in channels.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match platform.send_channel_message(channel, &safe_text).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                log::warn!("Broadcast to channel {} failed: {}", channel, e);
                report.failed += 1;
            }
        }
    }

    log::info!(
        "Channel broadcast finished: {} sent, {} failed",
        report.sent,
        report.failed
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use sponsorcore::{MembershipStatus, PlatformError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPlatform {
        direct: Mutex<Vec<(i64, String)>>,
        posts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessagingPlatform for RecordingPlatform {
        async fn membership_status(&self, _channel: &str, _user_id: i64) -> Result<MembershipStatus, PlatformError> {
            Ok(MembershipStatus::Unknown)
        }

        async fn self_admin_status(&self, _channel: &str) -> Result<bool, PlatformError> {
            Ok(false)
        }

        async fn send_direct_message(&self, user_id: i64, text: &str) -> Result<(), PlatformError> {
            if user_id < 0 {
                return Err(PlatformError::Unreachable("blocked".to_string()));
            }
            self.direct.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }

        async fn send_channel_message(&self, channel: &str, text: &str) -> Result<(), PlatformError> {
            self.posts.lock().unwrap().push((channel.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_user_broadcast_counts_failures() {
        let platform = RecordingPlatform::default();
        let report = broadcast_to_users(&platform, &[1, -2, 3], "Hi <all>", Duration::ZERO).await;

        assert_eq!(report, BroadcastReport { sent: 2, failed: 1 });
        assert_eq!(
            platform.direct.lock().unwrap().clone(),
            vec![(1, "Hi &lt;all&gt;".to_string()), (3, "Hi &lt;all&gt;".to_string())]
        );
    }

    #[tokio::test]
    async fn test_channel_broadcast() {
        let platform = RecordingPlatform::default();
        let channels = vec!["@alpha".to_string(), "-100123".to_string()];
        let report = broadcast_to_channels(&platform, &channels, "News & updates", Duration::ZERO).await;

        assert_eq!(report, BroadcastReport { sent: 2, failed: 0 });
        assert_eq!(platform.posts.lock().unwrap()[1].1, "News &amp; updates");
    }
}
