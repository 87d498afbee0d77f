//! Structured logging field name constants for kbcheck.
//!
//! Spans declare these fields as `field::Empty` and fill them in with
//! `Span::record` once the value is known.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (quota retry, failed cleanup, missing knowledge) |
//! | INFO  | Lifecycle events (startup, run start/finish) |
//! | DEBUG | Decision points, poll ticks, config choices |
//! | TRACE | High-volume data (prompt bodies) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Operator session identifier.
pub const SESSION_ID: &str = "session_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Service-assigned remote asset name.
pub const ASSET: &str = "asset";

/// Lifecycle stage.
pub const STAGE: &str = "stage";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";
