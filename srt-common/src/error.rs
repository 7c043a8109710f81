//! Common error types for SRT services

use thiserror::Error;

/// Common result type for SRT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the SRT crates
#[derive(Error, Debug)]
pub enum Error {
    /// Score database failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure while reading config, snapshots or the database directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}
