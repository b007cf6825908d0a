//! Common error types for the ballot workspace

use thiserror::Error;

/// Common result type for ballot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the ballot crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Credentials or session token rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Stored value failed validation when read back from the database
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Corrupt(e.to_string())
    }
}
