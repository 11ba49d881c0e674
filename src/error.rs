//! Error types for the movie advisor.

use thiserror::Error;

/// Library-level error type for movie advisor operations.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watch-list store error: {0}")]
    Store(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Movie database error: {0}")]
    MovieDb(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Result type alias for movie advisor operations.
pub type Result<T> = std::result::Result<T, AdvisorError>;
