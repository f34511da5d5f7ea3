use std::sync::Arc;

use anyhow::Result;
use dishcore::core::{init_logger, log_startup_configuration};
use dishcore::{PgStore, Settings};
use teloxide::prelude::*;
use tokio::signal;

use dishbot::api::router;
use dishbot::cli::{Cli, Commands};
use dishbot::state::AppState;
use dishbot::telegram::{create_bot, setup_bot_commands, Notifier};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the subcommand; no subcommand means `run`.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // .env is optional; real deployments pass the environment directly
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env()?;
    init_logger(&settings.log_file_path)?;

    match cli.command {
        Some(Commands::Migrate) => run_migrations(&settings).await,
        Some(Commands::SetWebhook { url }) => set_webhook(&settings, &url).await,
        Some(Commands::Run) | None => run_server(settings).await,
    }
}

async fn connect_store(settings: &Settings) -> Result<PgStore> {
    use secrecy::ExposeSecret;

    let store = PgStore::connect(settings.database_url.expose_secret()).await?;
    store.migrate().await?;
    Ok(store)
}

async fn run_migrations(settings: &Settings) -> Result<()> {
    connect_store(settings).await?;
    log::info!("Database migrations applied");
    Ok(())
}

async fn set_webhook(settings: &Settings, url: &str) -> Result<()> {
    let bot = create_bot(settings)?;
    bot.set_webhook(url::Url::parse(url)?).await?;
    log::info!("Webhook set to {}", url);
    Ok(())
}

async fn run_server(settings: Settings) -> Result<()> {
    log_startup_configuration(&settings);

    let store = connect_store(&settings).await?;
    let bot = create_bot(&settings)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let settings = Arc::new(settings);
    let notifier = Notifier::new(bot, settings.admin_chat_id);
    let state = Arc::new(AppState::new(Arc::clone(&settings), Arc::new(store), notifier)?);
    let app = router(state);

    let addr = format!("0.0.0.0:{}", settings.web_port);
    log::info!("🌐 Starting dishdash API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
