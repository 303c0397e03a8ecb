//! Error types for deposit_watch

use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP transport error talking to the backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend error ({status}): {body}")]
    Backend { status: u16, body: String },

    /// Push channel failure (handshake or mid-session)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Precondition not met; rejected before any I/O
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Lookup miss (wallet not in registry, etc.)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable reason, used in log fields and notices
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration_error",
            AppError::Http(_) => "http_error",
            AppError::Backend { .. } => "backend_error",
            AppError::Transport(_) => "transport_error",
            AppError::Precondition(_) => "precondition_failed",
            AppError::NotFound(_) => "not_found",
            AppError::Decode(_) => "decode_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether this is a precondition rejection (surfaced as a warning, not an error)
    pub fn is_precondition(&self) -> bool {
        matches!(self, AppError::Precondition(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
