//! Error types for the protocol_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for protocol_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A requested entity identity does not resolve
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Malformed template or instance data, rejected before anything is applied
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duration unit tag outside `s`, `min`, `hr`
    #[error("Invalid duration unit: {0:?}")]
    InvalidUnit(String),

    /// Instance-tier back-reference whose template no longer exists
    #[error("Dangling {kind} reference: {id}")]
    DanglingTemplateReference { kind: &'static str, id: String },

    /// Operation refused because of the current state of related records
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
