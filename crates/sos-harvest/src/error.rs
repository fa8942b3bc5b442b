//! Error types for the harvest pipeline

use sos_common::SosError;

use crate::store::StoreError;
use crate::writer::WriteError;

pub type Result<T> = std::result::Result<T, HarvestError>;

/// Download or metadata fetch failure
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a harvest run
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Common(#[from] SosError),
}

impl From<regex::Error> for HarvestError {
    fn from(err: regex::Error) -> Self {
        HarvestError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Parse(err.to_string())
    }
}

impl From<csv::Error> for HarvestError {
    fn from(err: csv::Error) -> Self {
        HarvestError::Parse(err.to_string())
    }
}

impl From<zip::result::ZipError> for HarvestError {
    fn from(err: zip::result::ZipError) -> Self {
        HarvestError::Parse(err.to_string())
    }
}

impl From<quick_xml::Error> for HarvestError {
    fn from(err: quick_xml::Error) -> Self {
        HarvestError::Metadata(err.to_string())
    }
}
