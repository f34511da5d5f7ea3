//! Telegram side: outbound notifications, inline keyboards and the webhook

pub mod bot;
pub mod callback;
pub mod invoice;
pub mod keyboard;
pub mod notifications;
pub mod webapp_auth;
pub mod webhook;

pub use bot::{create_bot, setup_bot_commands};
pub use notifications::Notifier;
