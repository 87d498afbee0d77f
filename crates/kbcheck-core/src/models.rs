//! Domain types shared across kbcheck crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// REMOTE ASSETS
// =============================================================================

/// Processing state of an asset held by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    Uploading,
    Processing,
    Ready,
    Failed,
}

impl AssetState {
    /// Ready and Failed end the poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssetState::Ready | AssetState::Failed)
    }
}

/// A video handed to the remote service.
///
/// Not owned by any local process: whoever uploads it must delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    /// Service-assigned identifier (e.g. `files/abc123`).
    pub name: String,
    /// URI used to reference the asset in a prompt.
    pub uri: String,
    pub mime_type: String,
    pub state: AssetState,
}

// =============================================================================
// MEDIA
// =============================================================================

/// Broad category of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type. Returns None for anything that is not image or video.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let top = mime_type.split('/').next().unwrap_or_default();
        match top.trim().to_ascii_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// What accompanies the prompt text in a remote generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    /// Image bytes sent inline with the prompt.
    Image { data: Vec<u8>, mime_type: String },
    /// Reference to an uploaded, ready video.
    Video(RemoteAsset),
    /// Prompt text only (chat).
    TextOnly,
}

/// Model entry returned by the service's model listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Fully qualified name (e.g. `models/gemini-1.5-flash`).
    pub name: String,
    pub display_name: Option<String>,
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods.iter().any(|m| m == method)
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Stage of one upload → analyze run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Idle,
    Saving,
    Uploading,
    Processing,
    Analyzing,
    Done,
    Failed,
}

impl LifecycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStage::Idle => "idle",
            LifecycleStage::Saving => "saving",
            LifecycleStage::Uploading => "uploading",
            LifecycleStage::Processing => "processing",
            LifecycleStage::Analyzing => "analyzing",
            LifecycleStage::Done => "done",
            LifecycleStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator feedback emitted at fixed checkpoints. Carries no control-flow meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub stage: LifecycleStage,
    pub message: String,
}

/// Result of a completed media check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub media_kind: MediaKind,
    pub model: String,
    /// Free-text (usually markdown) judgment from the model.
    pub text: String,
    pub progress: Vec<ProgressUpdate>,
    pub duration_ms: u64,
    /// True when the knowledge base could not be loaded for this run.
    pub knowledge_missing: bool,
}

// =============================================================================
// CHAT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Ordered chat history for one operator session. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatTranscript {
    turns: Vec<ChatTurn>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. The transcript is append-only between clears.
    pub fn append_turn(&mut self, role: ChatRole, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
