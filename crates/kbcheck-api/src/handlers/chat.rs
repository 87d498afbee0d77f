//! Knowledge-base chat handlers.
//!
//! The transcript belongs to the caller's session. Each question is answered
//! by a fresh remote call.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kbcheck_core::ChatTurn;

use crate::{ApiError, AppState, OperatorSession, RequireAccess};

/// Request body for asking a question.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Answer plus the updated transcript.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub turns: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<ChatTurn>,
}

/// Return the session's transcript.
pub async fn get_transcript(_access: RequireAccess, session: OperatorSession) -> Response {
    let body = {
        let ctx = session.context.lock().await;
        TranscriptResponse {
            session_id: ctx.id,
            created_at: ctx.created_at,
            turns: ctx.transcript.turns().to_vec(),
        }
    };
    session.respond(Json(body))
}

/// Ask a question against the knowledge base.
///
/// The question stays in the transcript even if answering fails.
pub async fn ask_question(
    _access: RequireAccess,
    State(state): State<AppState>,
    session: OperatorSession,
    Json(req): Json<AskRequest>,
) -> Response {
    let services = match state.services() {
        Ok(services) => services,
        Err(e) => return session.respond(e),
    };

    let mut ctx = session.context.lock().await;
    let result = services.chat.ask(&mut ctx.transcript, &req.question).await;
    let turns = ctx.transcript.turns().to_vec();
    drop(ctx);

    match result {
        Ok(answer) => session.respond(Json(AskResponse { answer, turns })),
        Err(e) => session.respond(ApiError::from(e)),
    }
}

/// Clear the session's transcript.
pub async fn clear_transcript(_access: RequireAccess, session: OperatorSession) -> Response {
    session.context.lock().await.transcript.clear();
    session.respond(Json(serde_json::json!({ "cleared": true })))
}
