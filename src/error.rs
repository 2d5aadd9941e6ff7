//! Error handling for the chess trainer

use thiserror::Error;

/// Unified error type for the trainer library
#[derive(Error, Debug)]
pub enum TrainerError {
    /// Missing or invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] chess_trainer_auth::AuthError),

    /// Database query errors
    #[error("Database error: {0}")]
    Database(#[from] chess_trainer_postgrest::PostgrestError),

    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Session file errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The position could not be set up from a puzzle's FEN
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}

/// Result type for trainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;
