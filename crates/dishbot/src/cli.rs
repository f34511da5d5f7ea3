use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dishbot")]
#[command(author, version, about = "Food-ordering backend with a Telegram delivery workflow", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and webhook receiver
    Run,

    /// Apply pending database migrations and exit
    Migrate,

    /// Point the bot's webhook at this server
    SetWebhook {
        /// Public URL of POST /api/webhook
        #[arg(long)]
        url: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
