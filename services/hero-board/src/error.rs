//! Error types for the hero-board service

/// Errors that can occur in the hero-board service
#[derive(Debug, thiserror::Error)]
pub enum HeroBoardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Insert failed: {0}")]
    Insert(String),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Dashboard error: {0}")]
    Dashboard(String),
}

/// Result type alias for hero-board operations
pub type Result<T> = std::result::Result<T, HeroBoardError>;
