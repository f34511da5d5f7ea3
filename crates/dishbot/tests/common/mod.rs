//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod memory_store;
pub mod telegram_mock;

#[allow(unused_imports)]
pub use fixtures::{TestApp, TestResponse};
#[allow(unused_imports)]
pub use memory_store::MemoryStore;
#[allow(unused_imports)]
pub use telegram_mock::{SentMessage, TelegramMock};
