//! dishcore: orders, delivery lifecycle, routing and storage for dishdash
//!
//! No HTTP server lives here; `dishbot` wires these pieces to axum and Telegram.

pub mod catalog;
pub mod core;
pub mod geo;
pub mod maps;
pub mod order;
pub mod pricing;
pub mod route;
pub mod storage;

pub use crate::core::{config, AppError, AppResult, Settings};
pub use geo::{Coordinates, Location};
pub use order::{Order, OrderStatus, TransitionPolicy};
pub use storage::{PgStore, Store};
