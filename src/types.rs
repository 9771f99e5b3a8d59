//! Error types for livebind

use thiserror::Error;

/// Errors produced by the binding layer
#[derive(Error, Debug)]
pub enum LivebindError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Locator does not address a single document position
    #[error("Invalid locator '{0}': expected alternating collection/id segments")]
    Locator(String),
}

/// Result type alias using LivebindError
pub type Result<T> = std::result::Result<T, LivebindError>;
