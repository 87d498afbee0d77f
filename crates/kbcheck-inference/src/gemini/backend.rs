//! Gemini generative-AI client implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use tracing::{debug, info, warn};

use kbcheck_core::defaults::{
    ENV_GEMINI_API_KEY, ENV_GEMINI_BASE_URL, ENV_GEMINI_MODEL, ENV_GEMINI_TIMEOUT,
    ENV_GOOGLE_API_KEY, GEMINI_MODEL, GEMINI_TIMEOUT_SECS, GEMINI_URL, MODEL_LIST_PAGE_SIZE,
};
use kbcheck_core::{
    AssetState, Error, MediaInput, ModelInfo, RemoteAnalysisClient, RemoteAsset, Result,
};

use super::error::{to_kbcheck_error, GeminiErrorCode};
use super::types::*;

/// Header carrying the API credential.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for the Gemini client.
#[derive(Clone)]
pub struct GeminiConfig {
    /// Base URL for the REST API.
    pub base_url: String,
    /// Base URL for media uploads (same host as `base_url` in production).
    pub upload_url: String,
    /// API key. Never logged.
    pub api_key: String,
    /// Model used for generation.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("upload_url", &self.upload_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl GeminiConfig {
    /// Config with defaults for everything but the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: GEMINI_URL.to_string(),
            upload_url: GEMINI_URL.to_string(),
            api_key: api_key.into(),
            model: GEMINI_MODEL.to_string(),
            timeout_seconds: GEMINI_TIMEOUT_SECS,
        }
    }

    /// Point both REST and upload endpoints at one base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.upload_url = base_url.clone();
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Load from environment variables.
    ///
    /// Fails with `Error::Config` when neither `GEMINI_API_KEY` nor
    /// `GOOGLE_API_KEY` is set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_GEMINI_API_KEY)
            .or_else(|_| std::env::var(ENV_GOOGLE_API_KEY))
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "API key not set. Set {} (or {}).",
                    ENV_GEMINI_API_KEY, ENV_GOOGLE_API_KEY
                ))
            })?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var(ENV_GEMINI_BASE_URL) {
            config = config.with_base_url(base_url);
        }
        if let Ok(model) = std::env::var(ENV_GEMINI_MODEL) {
            config.model = model;
        }
        config.timeout_seconds = std::env::var(ENV_GEMINI_TIMEOUT)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(GEMINI_TIMEOUT_SECS);
        Ok(config)
    }
}

/// Client for the Gemini Files and GenerateContent APIs.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("API key cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing Gemini client: url={}, model={}",
            config.base_url, config.model
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Model path segment without the `models/` prefix.
    fn model_id(&self) -> &str {
        self.config
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.config.model)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(API_KEY_HEADER, &self.config.api_key)
    }

    /// Turn a non-success response into a classified error.
    async fn error_from_response(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let api_status = serde_json::from_str::<ErrorResponse>(&body)
            .map(|r| r.error)
            .unwrap_or_default();

        let message = if api_status.message.is_empty() {
            format!("HTTP {}: {}", status, body)
        } else {
            format!("HTTP {}: {}", status, api_status.message)
        };
        let code =
            GeminiErrorCode::from_response(status, &api_status.status, &api_status.reasons());
        debug!(status, ?code, "Gemini request failed");
        to_kbcheck_error(code, &message)
    }
}

#[async_trait]
impl RemoteAnalysisClient for GeminiClient {
    async fn upload_asset(&self, local_path: &Path, mime_type: &str) -> Result<RemoteAsset> {
        let file = tokio::fs::File::open(local_path).await?;
        let size = file.metadata().await?.len();
        let display_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let metadata = serde_json::to_string(&UploadMetadata {
            file: UploadFileMetadata {
                display_name: display_name.clone(),
            },
        })?;

        let metadata_part = reqwest::multipart::Part::text(metadata)
            .mime_str("application/json")
            .map_err(|e| Error::Internal(format!("Failed to create multipart: {}", e)))?;
        // Streamed from disk.
        let file_part = reqwest::multipart::Part::stream_with_length(file, size)
            .file_name(display_name)
            .mime_str(mime_type)
            .map_err(|e| Error::InvalidInput(format!("Invalid MIME type {}: {}", mime_type, e)))?;
        let form = reqwest::multipart::Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let url = format!(
            "{}/upload/v1beta/files",
            self.config.upload_url.trim_end_matches('/')
        );
        debug!(mime_type, size, "Uploading asset");

        let response = self
            .authed(self.client.post(&url))
            .header("X-Goog-Upload-Protocol", "multipart")
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse upload response: {}", e)))?;

        let asset = body.file.into_remote_asset();
        info!(asset = %asset.name, state = ?asset.state, "Asset uploaded");
        Ok(asset)
    }

    async fn get_asset_status(&self, asset_name: &str) -> Result<AssetState> {
        let response = self
            .authed(self.client.get(self.url(asset_name)))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Status request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let file: GeminiFile = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse file status: {}", e)))?;

        let state = file.asset_state();
        if state == AssetState::Failed {
            if let Some(ref err) = file.error {
                warn!(asset = asset_name, error = %err.message, "Remote processing failed");
            }
        }
        Ok(state)
    }

    async fn run_prompt(&self, input: &MediaInput, prompt: &str) -> Result<String> {
        let mut parts = Vec::with_capacity(2);
        match input {
            MediaInput::Image { data, mime_type } => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                parts.push(Part::inline(mime_type.clone(), encoded));
            }
            MediaInput::Video(asset) => {
                parts.push(Part::file(asset.mime_type.clone(), asset.uri.clone()));
            }
            MediaInput::TextOnly => {}
        }
        parts.push(Part::text(prompt));

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        };

        let url = self.url(&format!("models/{}:generateContent", self.model_id()));
        debug!(model = %self.config.model, prompt_len = prompt.len(), "Running prompt");

        let response = self
            .authed(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse generation response: {}", e)))?;

        match body.text() {
            Some(text) => {
                debug!(response_len = text.len(), "Prompt completed");
                Ok(text)
            }
            None => Err(Error::Transport(format!(
                "Model returned no text ({})",
                body.empty_reason()
            ))),
        }
    }

    async fn delete_asset(&self, asset_name: &str) -> Result<()> {
        let response = self
            .authed(self.client.delete(self.url(asset_name)))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Delete request failed: {}", e)))?;

        // Already gone counts as deleted.
        if response.status().is_success() || response.status().as_u16() == 404 {
            debug!(asset = asset_name, "Asset deleted");
            return Ok(());
        }
        Err(Self::error_from_response(response).await)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .authed(self.client.get(self.url("models")))
                .query(&[("pageSize", MODEL_LIST_PAGE_SIZE.to_string())]);
            if let Some(ref token) = page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }

            let response = req
                .send()
                .await
                .map_err(|e| Error::Transport(format!("Model list request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Self::error_from_response(response).await);
            }

            let page: ListModelsResponse = response
                .json()
                .await
                .map_err(|e| Error::Transport(format!("Failed to parse model list: {}", e)))?;

            models.extend(page.models.into_iter().map(ModelInfo::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = models.len(), "Listed models");
        Ok(models)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
