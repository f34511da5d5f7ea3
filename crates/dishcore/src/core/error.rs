use thiserror::Error;

use crate::order::TransitionError;

/// Centralized error types for the library
///
/// Storage, outbound HTTP and order-lifecycle failures all surface as this enum.
/// The HTTP layer maps each variant onto a status code.
///
/// # Example
///
/// ```no_run
/// use dishcore::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A third-party API answered, but not with what we asked for
    #[error("{service} error: {details}")]
    Upstream { service: &'static str, details: String },

    /// A status change refused by the transition policy
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Stored row carries a status we cannot map
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// Entity lookup came back empty where one was required
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn upstream(service: &'static str, details: impl Into<String>) -> Self {
        AppError::Upstream {
            service,
            details: details.into(),
        }
    }
}
