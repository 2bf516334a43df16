//! Error types for the herald service

/// Errors that can occur in the herald service
#[derive(Debug, thiserror::Error)]
pub enum HeraldError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Status fetch failed: {0}")]
    Fetch(String),

    #[error("Settings persistence failed: {0}")]
    Persistence(String),

    #[error("Chat platform error: {0}")]
    Platform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for herald operations
pub type Result<T> = std::result::Result<T, HeraldError>;
