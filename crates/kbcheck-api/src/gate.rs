//! Passphrase access gate.
//!
//! Every gated request must carry the passphrase, either in the
//! `x-access-passphrase` header or as `Authorization: Bearer <passphrase>`.
//! Nothing is remembered between requests.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};
use tracing::warn;

use kbcheck_core::defaults::{ACCESS_HEADER, ENV_ACCESS_PASSPHRASE};
use kbcheck_core::Error;

use crate::{ApiError, AppState};

/// Outcome of comparing a supplied passphrase with the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
}

/// Compare `supplied` against `configured`.
///
/// Both sides are hashed first so the comparison time does not depend on how
/// much of the passphrase matched. An empty configured passphrase denies
/// everything.
pub fn check_access(supplied: &str, configured: &str) -> AccessDecision {
    if configured.is_empty() {
        return AccessDecision::Denied;
    }

    let supplied = Sha256::digest(supplied.as_bytes());
    let configured = Sha256::digest(configured.as_bytes());
    let diff = supplied
        .iter()
        .zip(configured.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    if diff == 0 {
        AccessDecision::Granted
    } else {
        AccessDecision::Denied
    }
}

/// Configured passphrase. Never logged.
#[derive(Clone, Default)]
pub struct AccessGate {
    passphrase: String,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl AccessGate {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    /// Read `ACCESS_PASSPHRASE`. Unset means every gated request is denied.
    pub fn from_env() -> Self {
        Self::new(std::env::var(ENV_ACCESS_PASSPHRASE).unwrap_or_default())
    }

    pub fn is_configured(&self) -> bool {
        !self.passphrase.is_empty()
    }

    pub fn check(&self, supplied: &str) -> AccessDecision {
        check_access(supplied, &self.passphrase)
    }
}

/// Passphrase supplied with the request, if any.
fn supplied_passphrase(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(ACCESS_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.trim());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Extractor that rejects the request with 401 unless the passphrase matches.
#[derive(Debug, Clone, Copy)]
pub struct RequireAccess;

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(supplied) = supplied_passphrase(&parts.headers) else {
            return Err(Error::Unauthorized("access passphrase required".to_string()).into());
        };

        match state.gate.check(supplied) {
            AccessDecision::Granted => Ok(RequireAccess),
            AccessDecision::Denied => {
                warn!(path = %parts.uri.path(), "Access denied");
                Err(Error::Unauthorized("invalid access passphrase".to_string()).into())
            }
        }
    }
}
