use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::sleep;

use sponsorbot::cli::{Cli, Commands};
use sponsorbot::stats::BotStats;
use sponsorbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramPlatform};
use sponsorcore::core::{init_logger, logging::log_startup_configuration};
use sponsorcore::storage::migrations::run_migrations;
use sponsorcore::{config, create_pool, get_connection, ChannelRegistry, RewardLedger, UserDirectory};

/// How many times `getMe` is retried while the Bot API is unreachable at startup
const STARTUP_MAX_RETRIES: u32 = 12;

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Log panics in handler tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::Migrate) => run_migrate(),
        Some(Commands::Stats { json }) => run_stats(json),
    }
}

/// Apply migrations without starting the bot
fn run_migrate() -> Result<()> {
    let pool = create_pool(&config::DATABASE_PATH)?;
    // create_pool already migrated; a second run is a cheap no-op check
    let mut conn = get_connection(&pool)?;
    run_migrations(&mut conn)?;
    log::info!("Database at {} is up to date", config::DATABASE_PATH.as_str());
    Ok(())
}

/// Print statistics to stdout
fn run_stats(json: bool) -> Result<()> {
    let pool = Arc::new(create_pool(&config::DATABASE_PATH)?);
    let stats = BotStats::collect(
        &ChannelRegistry::new(Arc::clone(&pool)),
        &RewardLedger::new(Arc::clone(&pool)),
        &UserDirectory::new(pool),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", stats.render());
    }
    Ok(())
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");
    log_startup_configuration();

    let bot = create_bot()?;

    // Retry if the Bot API is not reachable yet
    let bot_info = {
        let mut attempt = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    attempt += 1;
                    if attempt >= STARTUP_MAX_RETRIES {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} retries: {}",
                            attempt,
                            e
                        ));
                    }
                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying in 5 seconds...",
                        attempt,
                        STARTUP_MAX_RETRIES,
                        e
                    );
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    };
    let bot_username = bot_info.username.clone();
    log::info!("Bot username: {:?}, Bot ID: {}", bot_username, bot_info.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    // Create database connection pool
    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    let platform = Arc::new(TelegramPlatform::new(bot.clone(), bot_info.id));
    let deps = HandlerDeps::new(db_pool, platform, bot_username);

    use teloxide::update_listeners::Polling;

    // Create polling listener that drops pending updates on start
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
