//! Trait seams between the lifecycle controller and the remote service.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AssetState, MediaInput, ModelInfo, RemoteAsset};

/// Client for the external generative-AI service.
///
/// Every call is a fresh remote round trip; implementations do not cache.
#[async_trait]
pub trait RemoteAnalysisClient: Send + Sync {
    /// Upload a local file. Fails with `Error::Transport` on network/service failure.
    async fn upload_asset(&self, local_path: &Path, mime_type: &str) -> Result<RemoteAsset>;

    /// Current processing state of an uploaded asset.
    async fn get_asset_status(&self, asset_name: &str) -> Result<AssetState>;

    /// Run a prompt against the given media.
    ///
    /// Fails with `Error::QuotaExceeded` when the service signals rate limiting.
    async fn run_prompt(&self, input: &MediaInput, prompt: &str) -> Result<String>;

    /// Delete an uploaded asset. Callers treat failure as best-effort.
    async fn delete_asset(&self, asset_name: &str) -> Result<()>;

    /// Models visible to the configured credential.
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Model used for `run_prompt`.
    fn model_name(&self) -> &str;
}
