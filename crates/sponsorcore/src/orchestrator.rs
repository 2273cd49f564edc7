//! The "confirm subscription" workflow.
//!
//! ```text
//! confirm(user)
//!   -> list active channels
//!   -> check membership in each (fail-closed)
//!   -> missing non-empty: Incomplete
//!   -> no token: NoRewardAvailable
//!   -> token already held: AlreadyDispensed
//!   -> send DM -> failed: DeliveryFailed(SendFailed)
//!   -> dispense -> Dispensed | AlreadyDispensed | DeliveryFailed(TokenWithdrawn)
//! ```
//!
//! The orchestrator owns no persistent state. The DM goes out before the
//! ledger write, so a failed send leaves the ledger untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::timeout;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::ledger::{DispenseReceipt, RewardLedger, RewardToken};
use crate::platform::MessagingPlatform;
use crate::registry::{ChannelRegistry, NewChannel};
use crate::verifier::MembershipVerifier;

/// A required channel the user has not joined (or could not be verified in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingChannel {
    pub id: i64,
    pub identifier: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryFailure {
    /// The reward DM could not be delivered
    SendFailed,
    /// The token was deleted between selection and recording
    TokenWithdrawn,
}

/// Result of one confirm attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Incomplete { missing: Vec<MissingChannel> },
    NoRewardAvailable,
    /// The user already received the current token earlier
    AlreadyDispensed { token: RewardToken },
    /// `token.sent_count` equals `sent_count`
    Dispensed { token: RewardToken, sent_count: u64 },
    DeliveryFailed { reason: DeliveryFailure },
}

/// Result of registering a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredChannel {
    pub id: i64,
    pub bot_admin: bool,
}

/// Builds the DM text from a token payload.
pub type RewardFormatter = fn(&str) -> String;

fn plain_reward(payload: &str) -> String {
    payload.to_string()
}

#[derive(Clone)]
pub struct VerificationOrchestrator {
    registry: ChannelRegistry,
    ledger: RewardLedger,
    verifier: MembershipVerifier,
    platform: Arc<dyn MessagingPlatform>,
    send_timeout: Duration,
    format_reward: RewardFormatter,
}

impl VerificationOrchestrator {
    pub fn new(
        registry: ChannelRegistry,
        ledger: RewardLedger,
        verifier: MembershipVerifier,
        platform: Arc<dyn MessagingPlatform>,
    ) -> Self {
        Self {
            registry,
            ledger,
            verifier,
            platform,
            send_timeout: config::verification::timeout(),
            format_reward: plain_reward,
        }
    }

    #[must_use]
    pub fn with_reward_formatter(mut self, format_reward: RewardFormatter) -> Self {
        self.format_reward = format_reward;
        self
    }

    #[must_use]
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    /// Runs the confirm workflow for `user_id`.
    ///
    /// Membership problems never surface as errors; only store failures do.
    pub async fn confirm(&self, user_id: i64) -> AppResult<ConfirmOutcome> {
        let channels = self.registry.list_active(Utc::now())?;
        let checks = self.verifier.check_channels(&channels, user_id).await;

        let missing: Vec<MissingChannel> = checks
            .iter()
            .filter(|check| !check.verdict.is_member())
            .map(|check| MissingChannel {
                id: check.channel.id,
                identifier: check.channel.identifier.clone(),
                title: check.channel.title.clone(),
            })
            .collect();
        if !missing.is_empty() {
            log::info!(
                "User {} is missing {} of {} channels",
                user_id,
                missing.len(),
                channels.len()
            );
            return Ok(ConfirmOutcome::Incomplete { missing });
        }

        let Some(token) = self.ledger.latest_token()? else {
            log::info!("User {} verified but no reward token is available", user_id);
            return Ok(ConfirmOutcome::NoRewardAvailable);
        };

        if self.ledger.has_dispensed(token.id, user_id)? {
            log::info!("User {} already holds token {}", user_id, token.id);
            return Ok(ConfirmOutcome::AlreadyDispensed { token });
        }

        let text = (self.format_reward)(&token.payload);
        match timeout(self.send_timeout, self.platform.send_direct_message(user_id, &text)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::warn!("Failed to deliver token {} to user {}: {}", token.id, user_id, e);
                return Ok(ConfirmOutcome::DeliveryFailed {
                    reason: DeliveryFailure::SendFailed,
                });
            }
            Err(_) => {
                log::warn!(
                    "Delivering token {} to user {} timed out after {:?}",
                    token.id,
                    user_id,
                    self.send_timeout
                );
                return Ok(ConfirmOutcome::DeliveryFailed {
                    reason: DeliveryFailure::SendFailed,
                });
            }
        }

        match self.ledger.dispense(token.id, user_id) {
            Ok(DispenseReceipt::Recorded {
                sent_count,
                first_for_user,
            }) => {
                if first_for_user {
                    let verified: Vec<i64> = checks.iter().map(|check| check.channel.id).collect();
                    if let Err(e) = self.registry.record_subscribers(&verified) {
                        log::error!("Failed to update subscriber counters for user {}: {}", user_id, e);
                    }
                }
                let token = RewardToken { sent_count, ..token };
                Ok(ConfirmOutcome::Dispensed { token, sent_count })
            }
            Ok(DispenseReceipt::AlreadyRecorded) => Ok(ConfirmOutcome::AlreadyDispensed { token }),
            Err(AppError::TokenNotFound(id)) => {
                log::warn!("Token {} was withdrawn while delivering to user {}", id, user_id);
                Ok(ConfirmOutcome::DeliveryFailed {
                    reason: DeliveryFailure::TokenWithdrawn,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Inserts a channel and records whether the bot administers it.
    ///
    /// A failed admin check or flag write leaves the flag cleared; the insert stands.
    pub async fn register_channel(&self, channel: NewChannel) -> AppResult<RegisteredChannel> {
        let id = self.registry.insert(&channel)?;
        let bot_admin = self.check_bot_admin(&channel.identifier).await;
        if let Err(e) = self.registry.set_bot_admin_flag(&channel.identifier, bot_admin) {
            log::error!("Channel {} saved but its bot admin flag was not: {}", channel.identifier, e);
            return Ok(RegisteredChannel { id, bot_admin: false });
        }
        Ok(RegisteredChannel { id, bot_admin })
    }

    /// Re-checks bot admin rights in every channel. Returns how many are administered.
    pub async fn refresh_bot_admin_flags(&self) -> AppResult<usize> {
        let mut administered = 0;
        for channel in self.registry.list_all()? {
            let bot_admin = self.check_bot_admin(&channel.identifier).await;
            if bot_admin != channel.bot_admin {
                log::info!("Bot admin flag for {} changed to {}", channel.identifier, bot_admin);
            }
            self.registry.set_bot_admin_flag(&channel.identifier, bot_admin)?;
            if bot_admin {
                administered += 1;
            }
        }
        Ok(administered)
    }

    async fn check_bot_admin(&self, identifier: &str) -> bool {
        match self.verifier.is_bot_admin(identifier).await {
            Ok(flag) => flag,
            Err(e) => {
                log::warn!("Could not check bot rights in {}: {}", identifier, e);
                false
            }
        }
    }
}
