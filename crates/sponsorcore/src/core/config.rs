use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

// Configuration constants for the bot

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: sponsor_bot.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "sponsor_bot.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: sponsor_bot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "sponsor_bot.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Parses a boolean flag, accepting 1/0, true/false, yes/no, on/off
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

/// Membership verification configuration
pub mod verification {
    use super::{env_u64, parse_flag, Duration, Lazy};
    use std::env;

    /// Check all channels of one user concurrently
    /// Read from VERIFY_PARALLEL environment variable
    /// Default: true
    pub static PARALLEL: Lazy<bool> = Lazy::new(|| {
        env::var("VERIFY_PARALLEL")
            .ok()
            .and_then(|raw| parse_flag(&raw))
            .unwrap_or(true)
    });

    /// Upper bound for a single platform call (in seconds)
    /// Read from VERIFY_TIMEOUT_SECS environment variable
    pub static TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| env_u64("VERIFY_TIMEOUT_SECS", 10));

    /// Delay between sequential membership checks (in milliseconds)
    /// Read from VERIFY_PACING_MS environment variable
    pub static PACING_MS: Lazy<u64> = Lazy::new(|| env_u64("VERIFY_PACING_MS", 80));

    /// Platform call timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(*TIMEOUT_SECS)
    }

    /// Sequential pacing duration
    pub fn pacing() -> Duration {
        Duration::from_millis(*PACING_MS)
    }
}

/// Broadcast fan-out configuration
pub mod broadcast {
    use super::Duration;

    /// Delay between direct messages to users (in milliseconds)
    pub const USER_DELAY_MS: u64 = 50;

    /// Delay between posts to channels (in milliseconds)
    pub const CHANNEL_DELAY_MS: u64 = 100;

    /// User broadcast delay duration
    pub fn user_delay() -> Duration {
        Duration::from_millis(USER_DELAY_MS)
    }

    /// Channel broadcast delay duration
    pub fn channel_delay() -> Duration {
        Duration::from_millis(CHANNEL_DELAY_MS)
    }
}

/// Channel registry defaults
pub mod channels {
    /// Ordering key used when the admin form leaves it out or garbles it
    pub const DEFAULT_ORDER_KEY: i64 = 1000;

    /// Buttons per keyboard row in the channel list
    pub const BUTTONS_PER_ROW: usize = 2;
}

/// Database configuration
pub mod database {
    use super::Duration;

    /// Maximum number of pooled connections
    pub const POOL_SIZE: u32 = 10;

    /// How long a writer waits for the SQLite lock (in seconds)
    pub const BUSY_TIMEOUT_SECS: u64 = 30;

    /// Busy timeout duration
    pub fn busy_timeout() -> Duration {
        Duration::from_secs(BUSY_TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Administrator configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Check if user is admin
    pub fn is_admin(user_id: i64) -> bool {
        ADMIN_IDS.contains(&user_id)
    }
}
