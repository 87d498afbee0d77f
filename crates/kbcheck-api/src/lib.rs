//! # kbcheck-api
//!
//! HTTP front end for kbcheck: media compliance checks, knowledge-base chat,
//! and the model discovery diagnostic, all behind a passphrase gate.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::field;
use uuid::Uuid;

use kbcheck_core::defaults::MAX_UPLOAD_BYTES;
use kbcheck_core::{KnowledgeStore, RemoteAnalysisClient};
use kbcheck_inference::ModelDiscovery;
use kbcheck_jobs::{ChatService, LifecycleConfig, UploadLifecycle};

pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod session;

pub use config::ServerConfig;
pub use error::ApiError;
pub use gate::{check_access, AccessDecision, AccessGate, RequireAccess};
pub use session::{OperatorSession, SessionContext, SessionStore};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Everything that needs the remote analysis service.
pub struct AnalysisServices {
    pub lifecycle: UploadLifecycle,
    pub chat: ChatService,
    pub discovery: ModelDiscovery,
}

impl AnalysisServices {
    pub fn new(
        client: Arc<dyn RemoteAnalysisClient>,
        knowledge: KnowledgeStore,
        lifecycle: LifecycleConfig,
        include_history: bool,
    ) -> Self {
        Self {
            lifecycle: UploadLifecycle::new(Arc::clone(&client), knowledge.clone(), lifecycle),
            chat: ChatService::new(Arc::clone(&client), knowledge).with_history(include_history),
            discovery: ModelDiscovery::new(client),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// None when no API key is configured; analysis routes then return 503.
    pub services: Option<Arc<AnalysisServices>>,
    pub gate: Arc<AccessGate>,
    pub sessions: SessionStore,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(services: Option<AnalysisServices>, gate: AccessGate) -> Self {
        Self {
            services: services.map(Arc::new),
            gate: Arc::new(gate),
            sessions: SessionStore::new(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_session_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.sessions = SessionStore::with_idle_ttl(idle_ttl);
        self
    }

    /// The analysis services, or 503 when the service is not configured.
    pub fn services(&self) -> Result<&AnalysisServices, ApiError> {
        self.services.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable(
                "Analysis service not configured. Set GEMINI_API_KEY environment variable."
                    .to_string(),
            )
        })
    }
}

// =============================================================================
// ROUTER
// =============================================================================

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/check", post(handlers::check::check_media))
        .route(
            "/api/v1/chat",
            get(handlers::chat::get_transcript)
                .post(handlers::chat::ask_question)
                .delete(handlers::chat::clear_transcript),
        )
        .route("/api/v1/models", get(handlers::models::list_models))
        // Middleware
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id,
                    session_id = field::Empty,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        // Multipart honours DefaultBodyLimit; the outer layer caps every body.
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}
