//! Error types for kbcheck.

use thiserror::Error;

/// Result type alias using kbcheck's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kbcheck operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid credential, knowledge file, or other setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote call failed for a reason other than rate limiting
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote service signalled rate limiting / quota exhaustion
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Remote asset reached a terminal failure state
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// Remote asset did not become ready within the poll ceiling
    #[error("Timed out: {0}")]
    TimedOut(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Access gate denied the request
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short machine-readable name of the variant, used in operator-facing payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Transport(_) => "transport",
            Error::QuotaExceeded(_) => "quota_exceeded",
            Error::ProcessingFailed(_) => "processing_failed",
            Error::TimedOut(_) => "timed_out",
            Error::InvalidInput(_) => "invalid_input",
            Error::Unauthorized(_) => "unauthorized",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
            Error::Io(_) => "io",
        }
    }

    /// Whether this is the rate-limit signal the lifecycle retries once.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Error::QuotaExceeded(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing API key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing API key");
    }

    #[test]
    fn test_error_display_transport() {
        let err = Error::Transport("connection reset".to_string());
        assert_eq!(err.to_string(), "Transport error: connection reset");
    }

    #[test]
    fn test_error_display_quota_exceeded() {
        let err = Error::QuotaExceeded("429".to_string());
        assert_eq!(err.to_string(), "Quota exceeded: 429");
    }

    #[test]
    fn test_error_display_processing_failed() {
        let err = Error::ProcessingFailed("files/abc".to_string());
        assert_eq!(err.to_string(), "Processing failed: files/abc");
    }

    #[test]
    fn test_error_display_timed_out() {
        let err = Error::TimedOut("300 polls".to_string());
        assert_eq!(err.to_string(), "Timed out: 300 polls");
    }

    #[test]
    fn test_error_display_unauthorized() {
        let err = Error::Unauthorized("invalid passphrase".to_string());
        assert_eq!(err.to_string(), "Unauthorized: invalid passphrase");
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_kind_names_are_distinct() {
        let kinds = [
            Error::Config(String::new()).kind(),
            Error::Transport(String::new()).kind(),
            Error::QuotaExceeded(String::new()).kind(),
            Error::ProcessingFailed(String::new()).kind(),
            Error::TimedOut(String::new()).kind(),
            Error::InvalidInput(String::new()).kind(),
            Error::Unauthorized(String::new()).kind(),
            Error::Serialization(String::new()).kind(),
            Error::Internal(String::new()).kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn test_is_quota_exceeded() {
        assert!(Error::QuotaExceeded("x".to_string()).is_quota_exceeded());
        assert!(!Error::Transport("x".to_string()).is_quota_exceeded());
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
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
