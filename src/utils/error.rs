// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("Classifier rate limit exceeded")]
    RateLimited,

    #[error("Classifier returned an unusable reply: {0}")]
    EmptyReply(String),
}

impl ClassifierError {
    /// Rejected credentials: no fragment can succeed, so the run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClassifierError::Http(status)
                if *status == reqwest::StatusCode::UNAUTHORIZED || *status == reqwest::StatusCode::FORBIDDEN
        )
    }

    /// Connection drops, timeouts and server-side failures; worth another attempt
    /// after a pause. Rate limits are handled separately.
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifierError::Network(e) => e.is_timeout() || e.is_connect(),
            ClassifierError::Http(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::REQUEST_TIMEOUT
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Regular expression error: {0}")]
    RegexError(String),

    #[error("Could not read filing {0}: {1}")]
    Source(String, std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Classifier setup failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
