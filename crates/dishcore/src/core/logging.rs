//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file), with `log` records bridged into `tracing`
//! - Startup diagnostics for the optional integrations

use anyhow::{anyhow, Result};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Initialize logger for both console and file output
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a global logger is already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = fs_err::File::create(log_file_path).map_err(|e| anyhow!("Failed to create log file: {}", e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_log::LogTracer::init().map_err(|e| anyhow!("Failed to bridge log records: {}", e))?;

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(log_file)));

    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Optional integrations and whether they are configured
pub fn integration_summary(settings: &Settings) -> Vec<(&'static str, bool)> {
    vec![
        ("Google Directions (GOOGLE_MAPS_API_KEY)", settings.google_maps_api_key.is_some()),
        (
            "Supabase uploads (SUPABASE_URL + SUPABASE_SERVICE_ROLE_KEY)",
            settings.supabase_url.is_some() && settings.supabase_service_role_key.is_some(),
        ),
        ("Webhook owner (OWNER_ID)", settings.owner_id.is_some()),
        ("WebApp button (WEBAPP_URL)", settings.webapp_url.is_some()),
        ("Static front end (STATIC_DIR)", settings.static_dir.is_some()),
        ("Order invoices (TELEGRAM_PROVIDER_TOKEN)", settings.telegram_provider_token.is_some()),
    ]
}

/// Logs the effective configuration at application startup
///
/// Secrets are never printed, only whether they are present.
pub fn log_startup_configuration(settings: &Settings) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🍽️  dishdash configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Admin chat: {}", settings.admin_chat_id);
    log::info!("Status policy: {}", settings.status_policy);
    log::info!(
        "Depot: {:.4},{:.4} (used for ETA until a driver shares a location)",
        settings.depot.lat,
        settings.depot.lng
    );
    log::info!("Web port: {}", settings.web_port);

    for (name, configured) in integration_summary(settings) {
        if configured {
            log::info!("✅ {}", name);
        } else {
            log::warn!("⚠️  {}: not set", name);
        }
    }

    if settings.webapp_auth_required {
        log::info!("🔒 Customer endpoints require Telegram init data");
    } else {
        log::warn!("🔓 Customer endpoints trust the user_id parameter when init data is absent");
    }
}
