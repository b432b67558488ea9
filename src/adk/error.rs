// SPDX-License-Identifier: MIT

//! Typed error handling for oracle-choice
//!
//! One enum per concern. Provider faults never escape the completion client,
//! stage faults are captured in the trace, so in practice only storage and
//! configuration errors reach a caller.

use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum OracleError {
    /// Configuration errors (bad settings file, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model/provider errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Workflow-specific errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Settings could not be read or deserialized
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Workflow-specific errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No entry stage was set before compiling
    #[error("Workflow has no entry stage")]
    MissingEntry,

    /// An edge or the entry refers to a stage that was never added
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// Two stages registered under the same name
    #[error("Duplicate stage: {0}")]
    DuplicateStage(String),

    /// A stage whose contract forbids continuing failed
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    /// Safety limit on traversal length (cyclic edge tables)
    #[error("Workflow exceeded {0} steps")]
    MaxSteps(usize),
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Non-success response from the provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Transport-level failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Provider name with no adapter
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
}

/// Persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database could not be opened
    #[error("sqlite open failed at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Statement failed
    #[error("sqlite statement failed: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Column payload could not be encoded/decoded
    #[error("failed to encode stored payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Blocking task panicked or was cancelled
    #[error("storage task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl OracleError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl ModelError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<String> for OracleError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for OracleError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

pub type Result<T, E = OracleError> = std::result::Result<T, E>;
