//! Gemini-specific error handling.

use kbcheck_core::Error;

/// Gemini API error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiErrorCode {
    /// API key missing, invalid, or lacking permission.
    InvalidCredential,
    /// Rate limit or quota exhausted.
    QuotaExceeded,
    /// Model or file not found.
    NotFound,
    /// Malformed request or unsupported media.
    InvalidRequest,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

/// `ErrorInfo` reasons that mean the API key itself is unusable.
const CREDENTIAL_REASONS: &[&str] = &["API_KEY_INVALID", "API_KEY_EXPIRED"];

impl GeminiErrorCode {
    /// Determine error code from HTTP status, the `error.status` string and
    /// any `error.details[].reason` values.
    ///
    /// An invalid key arrives as 400 INVALID_ARGUMENT; only the detail
    /// reason tells it apart from a malformed request.
    pub fn from_response(status: u16, api_status: &str, reasons: &[&str]) -> Self {
        if reasons.iter().any(|r| CREDENTIAL_REASONS.contains(r)) {
            return Self::InvalidCredential;
        }
        match (status, api_status) {
            (429, _) | (_, "RESOURCE_EXHAUSTED") => Self::QuotaExceeded,
            (401, _) | (403, _) | (_, "UNAUTHENTICATED") | (_, "PERMISSION_DENIED") => {
                Self::InvalidCredential
            }
            (404, _) | (_, "NOT_FOUND") => Self::NotFound,
            (400, _) | (_, "INVALID_ARGUMENT") | (_, "FAILED_PRECONDITION") => {
                Self::InvalidRequest
            }
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// Convert a Gemini error to a kbcheck Error.
pub fn to_kbcheck_error(code: GeminiErrorCode, message: &str) -> Error {
    match code {
        GeminiErrorCode::InvalidCredential => {
            Error::Config(format!("Authentication failed: {}", message))
        }
        GeminiErrorCode::QuotaExceeded => Error::QuotaExceeded(message.to_string()),
        GeminiErrorCode::NotFound => Error::Transport(format!("Not found: {}", message)),
        GeminiErrorCode::InvalidRequest => {
            Error::Transport(format!("Request rejected: {}", message))
        }
        GeminiErrorCode::ServerError => Error::Transport(format!("Server error: {}", message)),
        GeminiErrorCode::Unknown => Error::Transport(message.to_string()),
    }
}
