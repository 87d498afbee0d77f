//! In-memory operator sessions.
//!
//! A session holds one chat transcript and ends when it has been idle for
//! longer than the configured TTL. Clients identify their session with the
//! `x-session-id` header; a new id is issued when the header is missing or
//! malformed, and every session-scoped response echoes the id back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, Span};
use uuid::Uuid;

use kbcheck_core::defaults::{SESSION_HEADER, SESSION_IDLE_TTL_SECS};
use kbcheck_core::{logging, ChatTranscript};

use crate::{ApiError, AppState};

/// Per-operator state.
#[derive(Debug)]
pub struct SessionContext {
    pub id: Uuid,
    pub transcript: ChatTranscript,
    pub created_at: DateTime<Utc>,
}

impl SessionContext {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            transcript: ChatTranscript::new(),
            created_at: Utc::now(),
        }
    }
}

pub type SharedSession = Arc<Mutex<SessionContext>>;

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// Sessions keyed by id, dropped after `idle_ttl` without a request.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(Duration::from_secs(SESSION_IDLE_TTL_SECS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Look up `id`, creating the session if it does not exist. `None` issues a new id.
    ///
    /// Expired sessions are swept first, so an id that sat idle past the TTL
    /// comes back as a fresh, empty session.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SharedSession) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        Self::sweep(&mut sessions, now, self.idle_ttl);

        let id = id.unwrap_or_else(Uuid::now_v7);
        let entry = sessions.entry(id).or_insert_with(|| {
            debug!(session_id = %id, "Session created");
            SessionEntry {
                session: Arc::new(Mutex::new(SessionContext::new(id))),
                last_seen: now,
            }
        });
        entry.last_seen = now;
        (id, Arc::clone(&entry.session))
    }

    /// Drop every session idle for longer than the TTL. Returns how many were removed.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        Self::sweep(&mut sessions, Instant::now(), self.idle_ttl)
    }

    fn sweep(
        sessions: &mut HashMap<Uuid, SessionEntry>,
        now: Instant,
        idle_ttl: Duration,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) <= idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Extractor resolving the caller's session from `x-session-id`.
pub struct OperatorSession {
    pub id: Uuid,
    pub context: SharedSession,
}

impl OperatorSession {
    /// Attach the session id header to a response.
    pub fn respond(&self, body: impl IntoResponse) -> Response {
        ([(SESSION_HEADER, self.id.to_string())], body).into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for OperatorSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let requested = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok());

        let (id, context) = state.sessions.get_or_create(requested).await;
        Span::current().record(logging::SESSION_ID, id.to_string().as_str());

        Ok(OperatorSession { id, context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbcheck_core::ChatRole;

    #[tokio::test]
    async fn test_new_session_gets_v7_id() {
        let store = SessionStore::new();
        let (id, _) = store.get_or_create(None).await;
        assert_eq!(id.get_version_num(), 7);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_known_id_returns_same_session() {
        let store = SessionStore::new();
        let (id, session) = store.get_or_create(None).await;
        session
            .lock()
            .await
            .transcript
            .append_turn(ChatRole::User, "hi");

        let (again, same) = store.get_or_create(Some(id)).await;
        assert_eq!(again, id);
        assert_eq!(same.lock().await.transcript.len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let (_, a) = store.get_or_create(None).await;
        let (_, b) = store.get_or_create(None).await;

        a.lock().await.transcript.append_turn(ChatRole::User, "only in a");
        assert!(b.lock().await.transcript.is_empty());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_client_id_is_adopted() {
        let store = SessionStore::new();
        let id = Uuid::now_v7();
        let (got, _) = store.get_or_create(Some(id)).await;
        assert_eq!(got, id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let store = SessionStore::with_idle_ttl(Duration::from_secs(60));
        for _ in 0..100 {
            store.get_or_create(None).await;
        }
        assert_eq!(store.len().await, 100);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.evict_idle().await, 100);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_creating_a_session_sweeps_expired_ones() {
        let store = SessionStore::with_idle_ttl(Duration::from_secs(60));
        for _ in 0..10 {
            store.get_or_create(None).await;
        }

        tokio::time::advance(Duration::from_secs(61)).await;
        store.get_or_create(None).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_keeps_session_alive() {
        let store = SessionStore::with_idle_ttl(Duration::from_secs(60));
        let (id, session) = store.get_or_create(None).await;
        session
            .lock()
            .await
            .transcript
            .append_turn(ChatRole::User, "still here");

        tokio::time::advance(Duration::from_secs(45)).await;
        store.get_or_create(Some(id)).await;
        tokio::time::advance(Duration::from_secs(45)).await;

        let (again, same) = store.get_or_create(Some(id)).await;
        assert_eq!(again, id);
        assert_eq!(same.lock().await.transcript.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_id_returns_empty_session() {
        let store = SessionStore::with_idle_ttl(Duration::from_secs(60));
        let (id, session) = store.get_or_create(None).await;
        session
            .lock()
            .await
            .transcript
            .append_turn(ChatRole::User, "forgotten");

        tokio::time::advance(Duration::from_secs(61)).await;
        let (again, fresh) = store.get_or_create(Some(id)).await;
        assert_eq!(again, id);
        assert!(fresh.lock().await.transcript.is_empty());
    }
}
