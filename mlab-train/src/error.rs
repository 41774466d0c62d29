//! Error types for the mlab-train crate.

use thiserror::Error;

/// Top-level error type for training-report operations.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report rejected: status {status}: {body}")]
    Report { status: u16, body: String },

    #[error("Report sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TrainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}
