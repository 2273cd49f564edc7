//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup summary of the effective configuration

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup
///
/// Never logs the bot token itself, only whether it is present.
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Sponsor bot configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("DATABASE_PATH: {}", config::DATABASE_PATH.as_str());
    log::info!("LOG_FILE_PATH: {}", config::LOG_FILE_PATH.as_str());

    if config::BOT_TOKEN.is_empty() {
        log::error!("BOT_TOKEN: not set");
    } else {
        log::info!("BOT_TOKEN: set");
    }

    if config::admin::ADMIN_IDS.is_empty() {
        log::warn!("ADMIN_IDS: not set, the admin panel is unreachable");
    } else {
        log::info!("ADMIN_IDS: {} admin(s)", config::admin::ADMIN_IDS.len());
    }

    log::info!(
        "Verification: {} (timeout {}s, pacing {}ms)",
        if *config::verification::PARALLEL { "parallel" } else { "sequential" },
        *config::verification::TIMEOUT_SECS,
        *config::verification::PACING_MS
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    #[test]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // A second init in the same process fails; only the file matters here
        let _ = init_logger(path);

        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_init_logger_rejects_missing_directory() {
        let result = init_logger("/nonexistent-dir/for/sure/sponsor.log");
        assert!(result.is_err());
    }
}
