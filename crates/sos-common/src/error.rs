//! Error types shared across the SOS crates

use thiserror::Error;

/// Result type alias for SOS operations
pub type Result<T> = std::result::Result<T, SosError>;

/// Main error type for SOS
#[derive(Error, Debug)]
pub enum SosError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Data provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
