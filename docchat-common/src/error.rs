//! Error types for the docchat services.

use thiserror::Error;

/// Result type alias using the docchat error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for docchat services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session is unknown or has expired
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Upload rejected before any store mutation
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The model backend exhausted all retry attempts
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Cache or vector store unreachable
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::SessionNotFound(_) => 404,
            Self::UnsupportedFileType(_) | Self::InvalidInput(_) => 400,
            Self::Generation(_) => 502,
            Self::StoreUnavailable(_) => 503,
            _ => 500,
        }
    }

    /// Stable machine-readable kind for error envelopes.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::SessionNotFound(_) => "session_not_found",
            Self::UnsupportedFileType(_) => "unsupported_file_type",
            Self::InvalidInput(_) => "invalid_input",
            Self::Generation(_) => "generation_error",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal",
        }
    }
}
