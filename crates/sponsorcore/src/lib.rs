//! Sponsorcore - membership-gated reward dispensing
//!
//! This library holds everything the sponsor bot needs that does not talk
//! to Telegram directly: the channel registry, membership verification,
//! the reward ledger and the orchestrator that ties them together.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging
//! - `storage`: Database pool and migrations
//! - `platform`: The messaging platform seam implemented by the bot crate
//! - `registry`: Required channels
//! - `verifier`: Per-channel membership checks
//! - `ledger`: Reward tokens and the dispense log
//! - `users`: User profiles
//! - `orchestrator`: The "confirm subscription" workflow

pub mod core;
pub mod ledger;
pub mod orchestrator;
pub mod platform;
pub mod registry;
pub mod storage;
pub mod users;
pub mod verifier;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use ledger::{DispenseReceipt, DispenseRecord, LedgerStats, RewardLedger, RewardToken};
pub use orchestrator::{ConfirmOutcome, DeliveryFailure, MissingChannel, RegisteredChannel, VerificationOrchestrator};
pub use platform::{MembershipStatus, MessagingPlatform, PlatformError};
pub use registry::{Channel, ChannelRegistry, NewChannel};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use users::{UserDirectory, UserProfile};
pub use verifier::{ChannelCheck, CheckMode, MembershipVerifier, TransientQueryError, Verdict};
