//! Error types for the harmonization core

use thiserror::Error;

/// Result type for harmonization operations
pub type Result<T> = std::result::Result<T, HarmonizeError>;

/// Harmonization errors
#[derive(Error, Debug)]
pub enum HarmonizeError {
    #[error("Key not declared in the {kind} schema: {key}")]
    InvalidKey { kind: String, key: String },

    #[error("Key already set: {0} (pass overwrite to replace it)")]
    KeyExists(String),

    #[error("Key not set: {0}")]
    KeyNotExists(String),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Harmonization schema failed to load: {0}")]
    SchemaLoad(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarmonizeError {
    /// Shorthand for an `InvalidValue` with a reason
    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
