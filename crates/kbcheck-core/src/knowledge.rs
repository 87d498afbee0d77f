//! Read-only access to the knowledge base document.
//!
//! The document is re-read on every request so edits on disk take effect
//! without a restart. A missing or unreadable file is a soft failure: the
//! store returns a sentinel document whose text explains the problem, so
//! prompts still render and the model can tell the operator.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::defaults;

/// Immutable text of the knowledge base as loaded for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeDocument {
    text: String,
    missing: bool,
}

impl KnowledgeDocument {
    /// Wrap already-loaded knowledge text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            missing: false,
        }
    }

    /// Sentinel document used when the file cannot be read.
    pub fn missing(path: &Path, reason: &str) -> Self {
        Self {
            text: format!(
                "{} ({}): {}",
                defaults::KNOWLEDGE_MISSING_SENTINEL,
                path.display(),
                reason
            ),
            missing: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when this is the sentinel rather than real knowledge text.
    pub fn is_missing(&self) -> bool {
        self.missing
    }
}

/// Loads the knowledge document from a fixed path.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    path: PathBuf,
}

impl KnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create from the `KNOWLEDGE_PATH` environment variable.
    pub fn from_env() -> Self {
        let path = std::env::var(defaults::ENV_KNOWLEDGE_PATH)
            .unwrap_or_else(|_| defaults::KNOWLEDGE_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document wholesale. Never fails; see [`KnowledgeDocument::missing`].
    pub async fn load(&self) -> KnowledgeDocument {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    debug!(path = %self.path.display(), len = text.len(), "Loaded knowledge base");
                    KnowledgeDocument::new(text)
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Knowledge base is not valid UTF-8");
                    KnowledgeDocument::missing(&self.path, "file is not valid UTF-8")
                }
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Knowledge base unavailable");
                KnowledgeDocument::missing(&self.path, &e.to_string())
            }
        }
    }
}
