//! Error types for Flamyngo core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while higher-level code can use `anyhow` for
//! convenient error handling.
//!
//! Two failure modes from the data path are deliberately *not* errors: a field
//! path that cannot be resolved is an `Option::None`, and a value that fails
//! numeric inference falls back to a looser type.

use thiserror::Error;

/// Result type alias using FlamyngoError
pub type Result<T> = std::result::Result<T, FlamyngoError>;

/// Core error types for Flamyngo operations.
#[derive(Error, Debug)]
pub enum FlamyngoError {
    // === Configuration Errors ===
    /// Malformed or inconsistent settings; prevents startup
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === Request Errors ===
    /// The search string could not be turned into a query body
    #[error("invalid query: {reason}")]
    QueryError { reason: String },

    /// The request named a collection that is not configured
    #[error("unknown collection: {name}")]
    UnknownCollection { name: String },

    /// A named converter rejected its input
    #[error("cannot convert {value} with converter '{converter}'")]
    ConversionFailed { converter: String, value: String },

    // === Backend Errors ===
    /// The document store failed to execute an operation
    #[error("document store error: {operation} failed: {reason}")]
    Backend { operation: String, reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl FlamyngoError {
    /// Returns true if this error belongs to a single request and should be
    /// surfaced to the user rather than aborting the process.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            FlamyngoError::QueryError { .. }
                | FlamyngoError::UnknownCollection { .. }
                | FlamyngoError::ConversionFailed { .. }
        )
    }

    /// Returns true if this error must prevent startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, FlamyngoError::ConfigError { .. })
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        FlamyngoError::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a query error
    pub fn query(reason: impl Into<String>) -> Self {
        FlamyngoError::QueryError {
            reason: reason.into(),
        }
    }

    /// Create a backend error
    pub fn backend(operation: impl Into<String>, reason: impl ToString) -> Self {
        FlamyngoError::Backend {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a serialization error
    pub fn serialization(reason: impl Into<String>) -> Self {
        FlamyngoError::Serialization(reason.into())
    }
}

impl From<serde_json::Error> for FlamyngoError {
    fn from(err: serde_json::Error) -> Self {
        FlamyngoError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors() {
        let err = FlamyngoError::query("expected value at line 1 column 2");
        assert!(err.is_request_error());
        assert!(!err.is_fatal());

        let err = FlamyngoError::UnknownCollection {
            name: "materials".to_string(),
        };
        assert!(err.is_request_error());

        let err = FlamyngoError::backend("find", "connection reset");
        assert!(!err.is_request_error());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = FlamyngoError::config("duplicate alias");
        assert!(err.is_fatal());
        assert!(!err.is_request_error());
        assert_eq!(err.to_string(), "configuration error: duplicate alias");
    }
}
