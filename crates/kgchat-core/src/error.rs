//! Centralized error types for KGChat.

use std::time::Duration;

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum KgError {
    #[error("Entity catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Ambiguous entity '{span}': tied between {}", candidates.join(", "))]
    AmbiguousEntity { span: String, candidates: Vec<String> },

    #[error("Language model timed out after {0:?}")]
    ModelTimeout(Duration),

    #[error("Language model error: {0}")]
    ModelError(String),

    #[error("Could not generate a query: {0}")]
    SynthesisFailure(String),

    #[error("Query rejected: {0}")]
    SanitizationRejected(String),

    #[error("Forbidden operation: {0}")]
    ForbiddenOperation(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pipeline operations.
pub type KgResult<T> = Result<T, KgError>;

impl KgError {
    /// Create a model error.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a catalog error.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::CatalogUnavailable(msg.into())
    }
}
