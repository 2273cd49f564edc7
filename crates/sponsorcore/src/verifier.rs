//! Membership verification against the messaging platform.
//!
//! Checks are fail-closed: anything short of a definite membership answer
//! within the timeout counts as "not a member".

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::time::timeout;

use crate::core::config;
use crate::platform::{MessagingPlatform, PlatformError};
use crate::registry::Channel;

/// A membership query that produced no answer.
#[derive(Debug, Clone, Error)]
pub enum TransientQueryError {
    #[error("membership query for {channel} timed out after {after:?}")]
    Timeout { channel: String, after: Duration },

    #[error("membership query for {channel} failed: {source}")]
    Platform {
        channel: String,
        #[source]
        source: PlatformError,
    },
}

/// How `check_channels` walks the channel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// All channels at once
    Parallel,
    /// One by one, sleeping `pacing` between calls to stay under rate limits
    Sequential { pacing: Duration },
}

impl CheckMode {
    pub fn from_config() -> Self {
        if *config::verification::PARALLEL {
            CheckMode::Parallel
        } else {
            CheckMode::Sequential {
                pacing: config::verification::pacing(),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Verdict {
    Member,
    NotMember,
    /// The platform could not answer; treated as not a member
    Unverifiable(TransientQueryError),
}

impl Verdict {
    pub fn is_member(&self) -> bool {
        matches!(self, Verdict::Member)
    }
}

/// Verdict for one channel.
#[derive(Debug, Clone)]
pub struct ChannelCheck {
    pub channel: Channel,
    pub verdict: Verdict,
}

#[derive(Clone)]
pub struct MembershipVerifier {
    platform: Arc<dyn MessagingPlatform>,
    timeout: Duration,
    mode: CheckMode,
}

impl MembershipVerifier {
    pub fn new(platform: Arc<dyn MessagingPlatform>, timeout: Duration, mode: CheckMode) -> Self {
        Self {
            platform,
            timeout,
            mode,
        }
    }

    /// Verifier with timeout and mode taken from the environment.
    pub fn from_config(platform: Arc<dyn MessagingPlatform>) -> Self {
        Self::new(platform, config::verification::timeout(), CheckMode::from_config())
    }

    pub fn mode(&self) -> CheckMode {
        self.mode
    }

    /// Asks the platform whether `user_id` is a member of `channel`.
    pub async fn is_member(&self, channel: &str, user_id: i64) -> Result<bool, TransientQueryError> {
        let status = timeout(self.timeout, self.platform.membership_status(channel, user_id))
            .await
            .map_err(|_| TransientQueryError::Timeout {
                channel: channel.to_string(),
                after: self.timeout,
            })?
            .map_err(|source| TransientQueryError::Platform {
                channel: channel.to_string(),
                source,
            })?;

        log::debug!("User {} in {}: {}", user_id, channel, status);
        Ok(status.is_member())
    }

    /// Asks the platform whether the bot administers `channel`.
    pub async fn is_bot_admin(&self, channel: &str) -> Result<bool, TransientQueryError> {
        timeout(self.timeout, self.platform.self_admin_status(channel))
            .await
            .map_err(|_| TransientQueryError::Timeout {
                channel: channel.to_string(),
                after: self.timeout,
            })?
            .map_err(|source| TransientQueryError::Platform {
                channel: channel.to_string(),
                source,
            })
    }

    async fn check_one(&self, channel: &Channel, user_id: i64) -> ChannelCheck {
        let verdict = match self.is_member(&channel.identifier, user_id).await {
            Ok(true) => Verdict::Member,
            Ok(false) => Verdict::NotMember,
            Err(e) => {
                log::warn!("Treating user {} as not subscribed: {}", user_id, e);
                Verdict::Unverifiable(e)
            }
        };
        ChannelCheck {
            channel: channel.clone(),
            verdict,
        }
    }

    /// One verdict per channel, in input order. Never fails.
    pub async fn check_channels(&self, channels: &[Channel], user_id: i64) -> Vec<ChannelCheck> {
        match self.mode {
            CheckMode::Parallel => join_all(channels.iter().map(|channel| self.check_one(channel, user_id))).await,
            CheckMode::Sequential { pacing } => {
                let mut checks = Vec::with_capacity(channels.len());
                for (i, channel) in channels.iter().enumerate() {
                    if i > 0 && !pacing.is_zero() {
                        tokio::time::sleep(pacing).await;
                    }
                    checks.push(self.check_one(channel, user_id).await);
                }
                checks
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MembershipStatus;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct ScriptedPlatform {
        answers: HashMap<&'static str, Result<MembershipStatus, PlatformError>>,
        stall: Option<&'static str>,
    }

    #[async_trait]
    impl MessagingPlatform for ScriptedPlatform {
        async fn membership_status(&self, channel: &str, _user_id: i64) -> Result<MembershipStatus, PlatformError> {
            if self.stall == Some(channel) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.answers
                .get(channel)
                .cloned()
                .unwrap_or(Ok(MembershipStatus::Unknown))
        }

        async fn self_admin_status(&self, channel: &str) -> Result<bool, PlatformError> {
            Ok(channel == "@mine")
        }

        async fn send_direct_message(&self, _user_id: i64, _text: &str) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn send_channel_message(&self, _channel: &str, _text: &str) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn channel(id: i64, identifier: &str) -> Channel {
        Channel {
            id,
            identifier: identifier.to_string(),
            title: identifier.trim_start_matches('@').to_string(),
            order_key: 1000,
            expires_at: None,
            max_subscribers: None,
            bot_admin: false,
            subscriber_count: 0,
        }
    }

    fn platform() -> Arc<ScriptedPlatform> {
        let mut answers = HashMap::new();
        answers.insert("@member", Ok(MembershipStatus::Member));
        answers.insert("@owner", Ok(MembershipStatus::Creator));
        answers.insert("@left", Ok(MembershipStatus::Left));
        answers.insert("@broken", Err(PlatformError::Rejected("chat not found".to_string())));
        answers.insert("@slow", Ok(MembershipStatus::Member));
        Arc::new(ScriptedPlatform {
            answers,
            stall: Some("@slow"),
        })
    }

    fn verdict_names(checks: &[ChannelCheck]) -> Vec<(&str, &'static str)> {
        checks
            .iter()
            .map(|c| {
                let name = match c.verdict {
                    Verdict::Member => "member",
                    Verdict::NotMember => "not_member",
                    Verdict::Unverifiable(_) => "unverifiable",
                };
                (c.channel.identifier.as_str(), name)
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_checks_fail_closed() {
        let verifier = MembershipVerifier::new(platform(), Duration::from_secs(10), CheckMode::Parallel);
        let channels = vec![
            channel(1, "@member"),
            channel(2, "@left"),
            channel(3, "@broken"),
            channel(4, "@slow"),
            channel(5, "@owner"),
        ];

        let checks = verifier.check_channels(&channels, 7).await;
        assert_eq!(
            verdict_names(&checks),
            vec![
                ("@member", "member"),
                ("@left", "not_member"),
                ("@broken", "unverifiable"),
                ("@slow", "unverifiable"),
                ("@owner", "member"),
            ]
        );
        assert!(matches!(
            checks[3].verdict,
            Verdict::Unverifiable(TransientQueryError::Timeout { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_checks_keep_order() {
        let verifier = MembershipVerifier::new(
            platform(),
            Duration::from_secs(10),
            CheckMode::Sequential {
                pacing: Duration::from_millis(80),
            },
        );
        let channels = vec![channel(1, "@left"), channel(2, "@member")];

        let started = tokio::time::Instant::now();
        let checks = verifier.check_channels(&channels, 7).await;
        assert_eq!(verdict_names(&checks), vec![("@left", "not_member"), ("@member", "member")]);
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_empty_channel_list() {
        let verifier = MembershipVerifier::new(platform(), Duration::from_secs(1), CheckMode::Parallel);
        assert!(verifier.check_channels(&[], 7).await.is_empty());
    }

    #[tokio::test]
    async fn test_bot_admin_check() {
        let verifier = MembershipVerifier::new(platform(), Duration::from_secs(1), CheckMode::Parallel);
        assert!(verifier.is_bot_admin("@mine").await.unwrap());
        assert!(!verifier.is_bot_admin("@other").await.unwrap());
    }
}
