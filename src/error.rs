//! Error types for the lore crate

use thiserror::Error;

/// Result type for lore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for lore operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Site discovery error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Retrieval error
    #[error("Retrieval error: {0}")]
    Retrieve(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}
