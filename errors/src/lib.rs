//! # bookgraph Errors
//!
//! Error handling for the polyglot persistence backend.
//!
//! Two layers:
//! - [`StoreError`]: raised by the store adapters (Postgres, MongoDB,
//!   Redis, Neo4j). Carries the backend name so log lines identify which
//!   store misbehaved.
//! - [`CoreError`]: the domain-level taxonomy surfaced to callers. Store
//!   errors are converted at the service boundary; raw store error text is
//!   never returned to the client verbatim.

use thiserror::Error;

/// Errors raised by the store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection to {backend} failed: {reason}")]
    Connection { backend: String, reason: String },

    #[error("Query on {backend} failed: {reason}")]
    Query { backend: String, reason: String },

    #[error("Unique constraint violated on {backend}: {constraint}")]
    UniqueViolation { backend: String, constraint: String },

    #[error("Not found on {backend}: {id}")]
    NotFound { backend: String, id: String },

    #[error("Operation on {backend} timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl StoreError {
    /// True when the error is the store's structured duplicate-key signal.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

/// Domain-level errors surfaced to API callers.
///
/// Every variant maps to a stable HTTP status in the `api` crate:
/// 409, 404, 401, 403, 400, 429 and 500 respectively.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Unauthenticated: {reason}")]
    Unauthenticated { reason: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Rate limit exceeded: retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        CoreError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        CoreError::Unauthenticated {
            reason: reason.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        CoreError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CoreError::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Conflict { .. } => "CONFLICT",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Unauthenticated { .. } => "UNAUTHENTICATED",
            CoreError::Forbidden { .. } => "FORBIDDEN",
            CoreError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            CoreError::RateLimited { .. } => "RATE_LIMITED",
            CoreError::Internal { .. } => "INTERNAL",
        }
    }
}

impl From<StoreError> for CoreError {
    /// Default mapping for primary-store failures. Conversions that need a
    /// more specific outcome (idempotent follow insert, duplicate ISBN)
    /// match on [`StoreError::UniqueViolation`] before falling back here.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { constraint, .. } => CoreError::Conflict {
                message: format!("duplicate value for {constraint}"),
            },
            StoreError::NotFound { id, .. } => CoreError::NotFound { resource: id },
            other => CoreError::Internal {
                message: other.to_string(),
            },
        }
    }
}
