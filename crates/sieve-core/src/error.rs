//! Error types for the invoice anomaly sieve.

use thiserror::Error;

/// Result type used throughout the sieve workspace.
pub type SieveResult<T> = Result<T, SieveError>;

/// Errors surfaced by the scoring pipeline and its collaborators.
///
/// Propagation policy: feature extraction, model prediction, anomaly
/// scoring, rules, and fusion are total functions over well-formed inputs
/// and never produce this type. Only persistence, lookup, configuration,
/// and authentication can fail a request.
#[derive(Debug, Error)]
pub enum SieveError {
    /// Request payload failed validation (empty line items, bad threshold
    /// ordering, ...). Surfaced to the caller as 4xx; no persistence occurs.
    #[error("validation error: {0}")]
    Validation(String),

    /// A requested invoice or decision does not exist. Surfaced as 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bearer token missing, malformed, or failed verification. 401.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Database conflict or connectivity failure. Retried at most once at
    /// the transaction boundary; otherwise surfaced as 5xx with no partial
    /// writes.
    #[error("transient store error: {0}")]
    TransientStore(String),

    /// Threshold or tenant configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SieveError {
    /// Construct a [`SieveError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Construct a [`SieveError::NotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Construct a [`SieveError::Auth`].
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Construct a [`SieveError::TransientStore`].
    pub fn transient_store(msg: impl Into<String>) -> Self {
        Self::TransientStore(msg.into())
    }

    /// Construct a [`SieveError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error kind is safe to retry once at the transaction
    /// boundary per the concurrency model.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_) | Self::Database(_))
    }
}
