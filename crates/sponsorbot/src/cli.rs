use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sponsorbot")]
#[command(author, version, about = "Telegram bot that rewards users for joining sponsor channels", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling
    Run,

    /// Apply database migrations and exit
    Migrate,

    /// Print registry and ledger statistics
    Stats {
        /// Print as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
