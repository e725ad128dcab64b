//! Error types for the GameStore bridge
//!
//! This module defines all error types used throughout the crate.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Note that a provider finding nothing is *not* an error: it travels as the
//! [`NOT_FOUND`](crate::bus::NOT_FOUND) sentinel payload. Errors here are what a
//! caller of the gateway or the typed service can actually observe.

use std::time::Duration;
use thiserror::Error;

/// The primary error type for bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration-related errors (invalid values, unreadable files, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller's deadline elapsed before the request was resolved.
    #[error("Timed out after {after:?} waiting for request {id}")]
    Timeout { id: String, after: Duration },

    /// A reply arrived but its content could not be interpreted.
    #[error("Malformed reply for request {id}: {reason}")]
    MalformedReply { id: String, reason: String },

    /// A request the gateway refuses to forward.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The gateway is no longer accepting submissions, or a pending promise was
    /// dropped before it was resolved.
    #[error("Gateway closed")]
    GatewayClosed,

    /// A correlation id was registered while another request still held it.
    #[error("Duplicate correlation id: {0}")]
    DuplicateCorrelation(String),

    /// Catalog backend failures (unreadable record files, lookup faults, etc.)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A behavior step reported a failure to its scheduler.
    #[error("Behavior error: {0}")]
    Behavior(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Returns `true` if the caller gave up waiting rather than the request failing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout { .. })
    }
}

/// A specialized `Result` type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::Config("poll interval must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: poll interval must be positive"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = BridgeError::Timeout {
            id: "search_1".into(),
            after: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 250ms waiting for request search_1"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_malformed_reply_display() {
        let err = BridgeError::MalformedReply {
            id: "listPrimary_1".into(),
            reason: "expected array".into(),
        };
        assert!(err.to_string().contains("listPrimary_1"));
        assert!(err.to_string().contains("expected array"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BridgeError = io_err.into();
        assert!(matches!(err, BridgeError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: BridgeError = json_err.into();
        assert!(matches!(err, BridgeError::Json(_)));
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
