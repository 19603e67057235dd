use thiserror::Error;

use crate::types::InputError;

/// Top-level error type for paperverify operations.
///
/// Only configuration and malformed-input errors escape the verification
/// pipeline during normal operation. Oracle failures are absorbed by the
/// component that hit them and show up as degraded details in the verdict.
#[derive(Debug, Error)]
pub enum PaperVerifyError {
    // --- Caller errors ---
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    // --- Startup errors ---
    #[error("Configuration error: {0}")]
    Config(String),

    // --- Collaborator errors (normally recovered inside the pipeline) ---
    #[error("Oracle error: {0}")]
    Oracle(String),

    // --- Request lifecycle ---
    #[error("Verification cancelled")]
    Cancelled,

    #[error("Timeout: {0}")]
    Timeout(String),

    // --- Operational errors ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl PaperVerifyError {
    /// Whether the caller sent something the pipeline cannot work with.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::MalformedInput(_))
    }

    /// Whether the request ended before a verdict was produced.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }
}

impl From<InputError> for PaperVerifyError {
    fn from(e: InputError) -> Self {
        PaperVerifyError::MalformedInput(e.to_string())
    }
}

/// Result type alias for paperverify operations.
pub type Result<T> = std::result::Result<T, PaperVerifyError>;
