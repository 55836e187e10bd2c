//! Error types for the validation engine
//!
//! Only startup failures and malformed input are meant to reach callers.
//! Everything that can go wrong while a report is being built is absorbed
//! into a fallback value (see [`crate::outcome`]).

use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("No usable generative model; tried: {}", .attempts.join("; "))]
    NoUsableModel { attempts: Vec<String> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Provider returned no completion text")]
    EmptyCompletion,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// True for the errors that make the engine unable to serve any request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::MissingCredential(_)
                | EngineError::NoUsableModel { .. }
                | EngineError::InvalidConfig(_)
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => EngineError::Provider {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => EngineError::Http(e.to_string()),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
