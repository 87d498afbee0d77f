//! Scripted mock client for deterministic testing.
//!
//! Each remote operation pops its next outcome from a script, and every call
//! is logged so tests can assert on poll counts, retries, and cleanup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kbcheck_inference::mock::{MockAnalysisClient, MockFailure};
//!
//! let client = MockAnalysisClient::new()
//!     .with_processing_polls(3)
//!     .with_prompt_outcomes([Err(MockFailure::Quota), Ok("| Rule | OK |".to_string())]);
//! ```

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use kbcheck_core::{
    AssetState, Error, MediaInput, ModelInfo, RemoteAnalysisClient, RemoteAsset, Result,
};

/// Failure a scripted call should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Quota,
    Transport,
    Config,
}

impl MockFailure {
    fn to_error(self, op: &str) -> Error {
        match self {
            MockFailure::Quota => Error::QuotaExceeded(format!("mock {} rate limited", op)),
            MockFailure::Transport => Error::Transport(format!("mock {} failed", op)),
            MockFailure::Config => Error::Config(format!("mock {} rejected credential", op)),
        }
    }
}

/// Log of every call made against the mock.
#[derive(Debug, Clone, Default)]
pub struct MockCalls {
    /// Local paths passed to `upload_asset`.
    pub uploads: Vec<PathBuf>,
    /// Whether each uploaded path existed at upload time.
    pub upload_paths_existed: Vec<bool>,
    pub status_polls: usize,
    pub prompts: Vec<String>,
    pub inputs: Vec<MediaInput>,
    pub deletes: Vec<String>,
    pub model_listings: usize,
}

#[derive(Debug)]
struct MockState {
    upload_failure: Option<MockFailure>,
    statuses: VecDeque<std::result::Result<AssetState, MockFailure>>,
    prompt_outcomes: VecDeque<std::result::Result<String, MockFailure>>,
    default_response: String,
    delete_failure: Option<MockFailure>,
    models: Vec<ModelInfo>,
    calls: MockCalls,
    live_assets: HashSet<String>,
    next_asset: u32,
}

/// Mock remote client. Clones share state.
#[derive(Clone)]
pub struct MockAnalysisClient {
    model: String,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockAnalysisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalysisClient {
    /// Uploads succeed, assets are immediately ready, prompts return "Mock response".
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            state: Arc::new(Mutex::new(MockState {
                upload_failure: None,
                statuses: VecDeque::new(),
                prompt_outcomes: VecDeque::new(),
                default_response: "Mock response".to_string(),
                delete_failure: None,
                models: Vec::new(),
                calls: MockCalls::default(),
                live_assets: HashSet::new(),
                next_asset: 0,
            })),
        }
    }

    /// Status poll outcomes, in order. Once exhausted, polls report Ready.
    pub fn with_statuses(
        self,
        statuses: impl IntoIterator<Item = std::result::Result<AssetState, MockFailure>>,
    ) -> Self {
        self.state.lock().unwrap().statuses = statuses.into_iter().collect();
        self
    }

    /// Report Processing `n` times, then Ready.
    pub fn with_processing_polls(self, n: usize) -> Self {
        self.with_statuses(
            std::iter::repeat(Ok(AssetState::Processing))
                .take(n)
                .chain(std::iter::once(Ok(AssetState::Ready))),
        )
    }

    /// `run_prompt` outcomes, in order. Once exhausted, the fixed response is returned.
    pub fn with_prompt_outcomes(
        self,
        outcomes: impl IntoIterator<Item = std::result::Result<String, MockFailure>>,
    ) -> Self {
        self.state.lock().unwrap().prompt_outcomes = outcomes.into_iter().collect();
        self
    }

    pub fn with_fixed_response(self, response: impl Into<String>) -> Self {
        self.state.lock().unwrap().default_response = response.into();
        self
    }

    pub fn with_upload_failure(self, failure: MockFailure) -> Self {
        self.state.lock().unwrap().upload_failure = Some(failure);
        self
    }

    pub fn with_delete_failure(self, failure: MockFailure) -> Self {
        self.state.lock().unwrap().delete_failure = Some(failure);
        self
    }

    pub fn with_models(self, models: Vec<ModelInfo>) -> Self {
        self.state.lock().unwrap().models = models;
        self
    }

    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> MockCalls {
        self.state.lock().unwrap().calls.clone()
    }

    /// Assets uploaded and not yet successfully deleted.
    pub fn live_assets(&self) -> Vec<String> {
        let mut assets: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .live_assets
            .iter()
            .cloned()
            .collect();
        assets.sort();
        assets
    }
}

#[async_trait]
impl RemoteAnalysisClient for MockAnalysisClient {
    async fn upload_asset(&self, local_path: &Path, mime_type: &str) -> Result<RemoteAsset> {
        let mut state = self.state.lock().unwrap();
        state.calls.uploads.push(local_path.to_path_buf());
        state.calls.upload_paths_existed.push(local_path.exists());

        if let Some(failure) = state.upload_failure {
            return Err(failure.to_error("upload"));
        }

        state.next_asset += 1;
        let name = format!("files/mock-{}", state.next_asset);
        state.live_assets.insert(name.clone());

        Ok(RemoteAsset {
            uri: format!("mock://{}", name),
            name,
            mime_type: mime_type.to_string(),
            state: AssetState::Processing,
        })
    }

    async fn get_asset_status(&self, _asset_name: &str) -> Result<AssetState> {
        let mut state = self.state.lock().unwrap();
        state.calls.status_polls += 1;
        match state.statuses.pop_front() {
            Some(Ok(asset_state)) => Ok(asset_state),
            Some(Err(failure)) => Err(failure.to_error("status")),
            None => Ok(AssetState::Ready),
        }
    }

    async fn run_prompt(&self, input: &MediaInput, prompt: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.prompts.push(prompt.to_string());
        state.calls.inputs.push(input.clone());
        match state.prompt_outcomes.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(failure)) => Err(failure.to_error("prompt")),
            None => Ok(state.default_response.clone()),
        }
    }

    async fn delete_asset(&self, asset_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.deletes.push(asset_name.to_string());
        if let Some(failure) = state.delete_failure {
            return Err(failure.to_error("delete"));
        }
        state.live_assets.remove(asset_name);
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut state = self.state.lock().unwrap();
        state.calls.model_listings += 1;
        Ok(state.models.clone())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_processing_polls_then_ready() {
        let client = MockAnalysisClient::new().with_processing_polls(2);
        assert_eq!(client.get_asset_status("f").await.unwrap(), AssetState::Processing);
        assert_eq!(client.get_asset_status("f").await.unwrap(), AssetState::Processing);
        assert_eq!(client.get_asset_status("f").await.unwrap(), AssetState::Ready);
        assert_eq!(client.calls().status_polls, 3);
    }

    #[tokio::test]
    async fn test_prompt_outcomes_then_default() {
        let client = MockAnalysisClient::new()
            .with_fixed_response("fallback")
            .with_prompt_outcomes([Err(MockFailure::Quota), Ok("second".to_string())]);

        let first = client.run_prompt(&MediaInput::TextOnly, "p").await;
        assert!(first.unwrap_err().is_quota_exceeded());
        assert_eq!(client.run_prompt(&MediaInput::TextOnly, "p").await.unwrap(), "second");
        assert_eq!(client.run_prompt(&MediaInput::TextOnly, "p").await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn test_upload_and_delete_track_live_assets() {
        let client = MockAnalysisClient::new();
        let asset = client
            .upload_asset(Path::new("/nonexistent"), "video/mp4")
            .await
            .unwrap();
        assert_eq!(client.live_assets(), vec![asset.name.clone()]);
        assert_eq!(client.calls().upload_paths_existed, vec![false]);

        client.delete_asset(&asset.name).await.unwrap();
        assert!(client.live_assets().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_asset_live() {
        let client = MockAnalysisClient::new().with_delete_failure(MockFailure::Transport);
        let asset = client
            .upload_asset(Path::new("/nonexistent"), "video/mp4")
            .await
            .unwrap();
        assert!(client.delete_asset(&asset.name).await.is_err());
        assert_eq!(client.live_assets().len(), 1);
    }
}
