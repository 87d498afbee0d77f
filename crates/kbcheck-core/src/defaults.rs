//! Centralized default constants for kbcheck.
//!
//! **This module is the single source of truth** for shared default values
//! and environment variable names. Other crates reference these constants
//! instead of defining their own magic numbers.

// =============================================================================
// REMOTE SERVICE
// =============================================================================

/// Default Gemini API endpoint (also used for the upload endpoint).
pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Default generation model.
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default request timeout in seconds. Video generation calls can be slow.
pub const GEMINI_TIMEOUT_SECS: u64 = 300;

/// Page size used when listing models.
pub const MODEL_LIST_PAGE_SIZE: u32 = 100;

/// Generation method a model must support to be usable here.
pub const GENERATE_CONTENT_METHOD: &str = "generateContent";

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Interval between asset status polls.
pub const POLL_INTERVAL_SECS: u64 = 2;

/// Maximum number of status polls before the run is abandoned (~10 min at 2s).
pub const MAX_POLL_ATTEMPTS: u32 = 300;

/// Fixed wait before the single retry after a quota-exceeded response.
pub const QUOTA_BACKOFF_SECS: u64 = 30;

/// Prefix for per-run temporary files.
pub const TEMP_FILE_PREFIX: &str = "kbcheck-";

// =============================================================================
// KNOWLEDGE
// =============================================================================

/// Default path of the knowledge base document.
pub const KNOWLEDGE_PATH: &str = "knowledge.txt";

/// Prefix of the text substituted for an unreadable knowledge document.
pub const KNOWLEDGE_MISSING_SENTINEL: &str = "ERROR: knowledge base could not be loaded";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default upload limit in bytes (512 MiB).
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Header carrying the operator's access passphrase.
pub const ACCESS_HEADER: &str = "x-access-passphrase";

/// Header carrying the operator's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Sessions untouched for this long are dropped (30 minutes).
pub const SESSION_IDLE_TTL_SECS: u64 = 30 * 60;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// Alias accepted for the credential.
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_TIMEOUT: &str = "GEMINI_TIMEOUT";
pub const ENV_ACCESS_PASSPHRASE: &str = "ACCESS_PASSPHRASE";
pub const ENV_KNOWLEDGE_PATH: &str = "KNOWLEDGE_PATH";
pub const ENV_POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";
pub const ENV_MAX_POLL_ATTEMPTS: &str = "MAX_POLL_ATTEMPTS";
pub const ENV_QUOTA_BACKOFF_SECS: &str = "QUOTA_BACKOFF_SECS";
pub const ENV_CHAT_INCLUDE_HISTORY: &str = "CHAT_INCLUDE_HISTORY";
pub const ENV_MAX_UPLOAD_BYTES: &str = "MAX_UPLOAD_BYTES";
pub const ENV_SESSION_IDLE_TTL_SECS: &str = "SESSION_IDLE_TTL_SECS";
