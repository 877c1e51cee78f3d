//! Error types for scaffold.

use thiserror::Error;

/// Result type alias using scaffold's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for scaffold operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Bearer token missing, unknown, or revoked.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Record or token absent, or not owned by the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required field is missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network call or describe function failed.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Persisted local data does not parse as the record schema.
    #[error("Storage corruption: {0}")]
    StorageCorruption(String),

    /// Server reported a version other than the one this client was built for.
    #[error("Version mismatch: expected {expected}, server reports {actual}")]
    VersionMismatch { expected: String, actual: String },

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Only upstream failures qualify; every other variant is terminal for
    /// the request that produced it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Upstream(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unauthorized() {
        let err = Error::Unauthorized("invalid token".to_string());
        assert_eq!(err.to_string(), "Unauthorized: invalid token");
    }

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("Image not found".to_string());
        assert_eq!(err.to_string(), "Not found: Image not found");
    }

    #[test]
    fn test_error_display_storage_corruption() {
        let err = Error::StorageCorruption("expected array".to_string());
        assert_eq!(err.to_string(), "Storage corruption: expected array");
    }

    #[test]
    fn test_error_display_version_mismatch() {
        let err = Error::VersionMismatch {
            expected: "0.4.0".to_string(),
            actual: "0.3.9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Version mismatch: expected 0.4.0, server reports 0.3.9"
        );
    }

    #[test]
    fn test_only_upstream_is_transient() {
        assert!(Error::Upstream("timeout".into()).is_transient());
        assert!(!Error::Unauthorized("x".into()).is_transient());
        assert!(!Error::NotFound("x".into()).is_transient());
        assert!(!Error::StorageCorruption("x".into()).is_transient());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
