//! Server configuration.

use std::time::Duration;

use kbcheck_core::defaults::{
    ENV_MAX_UPLOAD_BYTES, ENV_SESSION_IDLE_TTL_SECS, MAX_UPLOAD_BYTES, SERVER_HOST, SERVER_PORT,
    SESSION_IDLE_TTL_SECS,
};

/// Listener, request-size and session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub session_idle_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: SERVER_HOST.to_string(),
            port: SERVER_PORT,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            session_idle_ttl: Duration::from_secs(SESSION_IDLE_TTL_SECS),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `HOST` | `0.0.0.0` | Bind address |
    /// | `PORT` | `3000` | Bind port |
    /// | `MAX_UPLOAD_BYTES` | `536870912` | Largest accepted request body |
    /// | `SESSION_IDLE_TTL_SECS` | `1800` | Idle time before a session is dropped |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| SERVER_HOST.to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(SERVER_PORT);
        let max_upload_bytes = std::env::var(ENV_MAX_UPLOAD_BYTES)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(MAX_UPLOAD_BYTES);
        let session_idle_ttl = std::env::var(ENV_SESSION_IDLE_TTL_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(SESSION_IDLE_TTL_SECS);

        Self {
            host,
            port,
            max_upload_bytes,
            session_idle_ttl: Duration::from_secs(session_idle_ttl),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
