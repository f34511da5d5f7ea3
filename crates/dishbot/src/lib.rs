//! dishbot: HTTP API, admin dashboard API and Telegram webhook for dishdash

pub mod api;
pub mod cli;
pub mod state;
pub mod telegram;
pub mod uploads;

pub use state::{AppState, SharedState};
