//! Upload → poll → analyze → cleanup lifecycle for one media check.
//!
//! Images go straight to analysis with their bytes inline. Videos are written
//! to a per-run temporary file, uploaded, polled until the remote service has
//! processed them, analyzed, and deleted. The temp file and the remote asset
//! are released on every exit path, including when the run future is dropped.

use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use kbcheck_core::defaults::{
    ENV_MAX_POLL_ATTEMPTS, ENV_POLL_INTERVAL_SECS, ENV_QUOTA_BACKOFF_SECS, MAX_POLL_ATTEMPTS,
    POLL_INTERVAL_SECS, QUOTA_BACKOFF_SECS, TEMP_FILE_PREFIX,
};
use kbcheck_core::{
    logging, prompts, AnalysisReport, AssetState, Error, KnowledgeStore, LifecycleStage,
    MediaInput, MediaKind, ProgressUpdate, RemoteAnalysisClient, RemoteAsset, Result,
};

/// Progress callback invoked at each checkpoint.
pub type ProgressCallback = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Timing knobs for the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Wait between asset status polls.
    pub poll_interval: Duration,
    /// Status polls allowed before the run fails with `Error::TimedOut`.
    pub max_poll_attempts: u32,
    /// Wait before the single retry after a quota-exceeded response.
    pub quota_backoff: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            quota_backoff: Duration::from_secs(QUOTA_BACKOFF_SECS),
        }
    }
}

impl LifecycleConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `POLL_INTERVAL_SECS` | `2` | Wait between status polls |
    /// | `MAX_POLL_ATTEMPTS` | `300` | Poll ceiling before timing out |
    /// | `QUOTA_BACKOFF_SECS` | `30` | Wait before the quota retry |
    pub fn from_env() -> Self {
        let poll_interval_secs = std::env::var(ENV_POLL_INTERVAL_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(POLL_INTERVAL_SECS);

        let max_poll_attempts = std::env::var(ENV_MAX_POLL_ATTEMPTS)
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(MAX_POLL_ATTEMPTS)
            .max(1);

        let quota_backoff_secs = std::env::var(ENV_QUOTA_BACKOFF_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(QUOTA_BACKOFF_SECS);

        Self {
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_poll_attempts,
            quota_backoff: Duration::from_secs(quota_backoff_secs),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    pub fn with_quota_backoff(mut self, backoff: Duration) -> Self {
        self.quota_backoff = backoff;
        self
    }
}

/// Collects checkpoint updates and forwards them to the caller's callback.
struct ProgressLog<'a> {
    callback: Option<&'a ProgressCallback>,
    updates: Vec<ProgressUpdate>,
}

impl<'a> ProgressLog<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            updates: Vec::new(),
        }
    }

    fn report(&mut self, percent: u8, stage: LifecycleStage, message: &str) {
        Span::current().record(logging::STAGE, stage.as_str());
        debug!(percent, %stage, message, "Progress");

        let update = ProgressUpdate {
            percent,
            stage,
            message: message.to_string(),
        };
        if let Some(callback) = self.callback {
            callback(&update);
        }
        self.updates.push(update);
    }

    fn into_updates(self) -> Vec<ProgressUpdate> {
        self.updates
    }
}

/// Drives one media check from raw bytes to the model's judgment.
pub struct UploadLifecycle {
    client: Arc<dyn RemoteAnalysisClient>,
    knowledge: KnowledgeStore,
    config: LifecycleConfig,
}

impl UploadLifecycle {
    pub fn new(
        client: Arc<dyn RemoteAnalysisClient>,
        knowledge: KnowledgeStore,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            client,
            knowledge,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Check one uploaded file against the knowledge base.
    ///
    /// Fails with `Error::InvalidInput` for empty data or a MIME type that is
    /// neither image nor video. Remote failures propagate after cleanup.
    pub async fn run(
        &self,
        data: &[u8],
        mime_type: &str,
        progress: Option<&ProgressCallback>,
    ) -> Result<AnalysisReport> {
        if data.is_empty() {
            return Err(Error::InvalidInput("Uploaded file is empty".to_string()));
        }
        let media_kind = MediaKind::from_mime(mime_type).ok_or_else(|| {
            Error::InvalidInput(format!("Unsupported media type: {}", mime_type))
        })?;

        let run_id = Uuid::now_v7();
        let span = info_span!(
            "media_check",
            run_id = %run_id,
            mime_type,
            media_len = data.len(),
            model = self.client.model_name(),
            asset = field::Empty,
            stage = field::Empty,
            duration_ms = field::Empty,
            success = field::Empty,
        );

        self.execute(run_id, media_kind, data, mime_type, progress)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        media_kind: MediaKind,
        data: &[u8],
        mime_type: &str,
        progress: Option<&ProgressCallback>,
    ) -> Result<AnalysisReport> {
        let started = Instant::now();
        let mut log = ProgressLog::new(progress);
        info!(?media_kind, "Media check started");

        let knowledge = self.knowledge.load().await;
        let prompt = prompts::analysis_prompt(knowledge.text(), media_kind);

        let outcome = match media_kind {
            MediaKind::Image => {
                let input = MediaInput::Image {
                    data: data.to_vec(),
                    mime_type: mime_type.to_string(),
                };
                self.analyze(&input, &prompt, &mut log).await
            }
            MediaKind::Video => {
                self.check_video(run_id, data, mime_type, &prompt, &mut log)
                    .await
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let span = Span::current();
        span.record(logging::DURATION_MS, duration_ms);
        span.record(logging::SUCCESS, outcome.is_ok());

        match outcome {
            Ok(text) => {
                log.report(100, LifecycleStage::Done, "Check complete");
                info!(response_len = text.len(), duration_ms, "Media check finished");
                Ok(AnalysisReport {
                    run_id,
                    media_kind,
                    model: self.client.model_name().to_string(),
                    text,
                    progress: log.into_updates(),
                    duration_ms,
                    knowledge_missing: knowledge.is_missing(),
                })
            }
            Err(e) => {
                span.record(logging::STAGE, LifecycleStage::Failed.as_str());
                warn!(error = %e, kind = e.kind(), duration_ms, "Media check failed");
                Err(e)
            }
        }
    }

    async fn check_video(
        &self,
        run_id: Uuid,
        data: &[u8],
        mime_type: &str,
        prompt: &str,
        log: &mut ProgressLog<'_>,
    ) -> Result<String> {
        log.report(10, LifecycleStage::Saving, "Saving upload");
        let temp_file = write_temp_file(run_id, data, mime_type).await?;

        log.report(20, LifecycleStage::Uploading, "Uploading to analysis service");
        let asset = self
            .client
            .upload_asset(temp_file.path(), mime_type)
            .await?;
        Span::current().record(logging::ASSET, asset.name.as_str());
        let guard = RemoteAssetGuard::new(Arc::clone(&self.client), asset.name.clone());

        let outcome = self.process_and_analyze(asset, prompt, log).await;

        guard.release().await;
        if let Err(e) = temp_file.close() {
            warn!(error = %e, "Failed to remove temporary file");
        }
        outcome
    }

    async fn process_and_analyze(
        &self,
        asset: RemoteAsset,
        prompt: &str,
        log: &mut ProgressLog<'_>,
    ) -> Result<String> {
        log.report(30, LifecycleStage::Processing, "Waiting for remote processing");
        match asset.state {
            AssetState::Ready => debug!("Asset ready at upload, skipping poll"),
            AssetState::Failed => return Err(processing_failed(&asset.name)),
            AssetState::Uploading | AssetState::Processing => {
                self.poll_until_ready(&asset.name).await?;
            }
        }

        let input = MediaInput::Video(RemoteAsset {
            state: AssetState::Ready,
            ..asset
        });
        self.analyze(&input, prompt, log).await
    }

    /// Poll the asset until it is ready. Returns the number of polls made.
    ///
    /// Sleeps `poll_interval` between polls. Fails with
    /// `Error::ProcessingFailed` if the asset fails remotely and
    /// `Error::TimedOut` once `max_poll_attempts` polls have not seen it ready.
    pub async fn poll_until_ready(&self, asset_name: &str) -> Result<u32> {
        let max_attempts = self.config.max_poll_attempts;

        for attempt in 1..=max_attempts {
            let state = self.client.get_asset_status(asset_name).await?;
            debug!(attempt, ?state, "Polled asset status");

            if state.is_terminal() {
                return match state {
                    AssetState::Failed => Err(processing_failed(asset_name)),
                    _ => Ok(attempt),
                };
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        Err(Error::TimedOut(format!(
            "{} was not ready after {} status checks",
            asset_name, max_attempts
        )))
    }

    /// Run the prompt, retrying exactly once after `quota_backoff` on quota errors.
    async fn analyze(
        &self,
        input: &MediaInput,
        prompt: &str,
        log: &mut ProgressLog<'_>,
    ) -> Result<String> {
        log.report(60, LifecycleStage::Analyzing, "Analyzing against knowledge base");

        match self.client.run_prompt(input, prompt).await {
            Err(e) if e.is_quota_exceeded() => {
                warn!(
                    error = %e,
                    backoff_secs = self.config.quota_backoff.as_secs(),
                    "Quota exceeded, retrying once after backoff"
                );
                log.report(
                    70,
                    LifecycleStage::Analyzing,
                    "Service busy, waiting before retry",
                );
                tokio::time::sleep(self.config.quota_backoff).await;
                self.client.run_prompt(input, prompt).await
            }
            other => other,
        }
    }
}

fn processing_failed(asset_name: &str) -> Error {
    Error::ProcessingFailed(format!("Remote processing of {} failed", asset_name))
}

/// Write the upload to a temp file unique to this run. Deleted when dropped.
async fn write_temp_file(run_id: Uuid, data: &[u8], mime_type: &str) -> Result<NamedTempFile> {
    let prefix = format!("{}{}-", TEMP_FILE_PREFIX, run_id);
    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(extension_for_mime(mime_type))
        .tempfile()
        .map_err(|e| Error::Internal(format!("Failed to create temp file: {}", e)))?;

    // Write through tokio so large uploads do not block a runtime worker.
    let mut writer = tokio::fs::File::from_std(file.reopen()?);
    writer
        .write_all(data)
        .await
        .map_err(|e| Error::Internal(format!("Failed to write temp file: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| Error::Internal(format!("Failed to flush temp file: {}", e)))?;

    debug!(path = %file.path().display(), size = data.len(), "Saved upload to temporary file");
    Ok(file)
}

/// File extension for a video MIME type, including the leading dot.
fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "video/mp4" => ".mp4",
        "video/quicktime" => ".mov",
        "video/webm" => ".webm",
        "video/x-msvideo" => ".avi",
        "video/x-matroska" => ".mkv",
        "video/mpeg" => ".mpeg",
        "video/3gpp" => ".3gp",
        "video/x-flv" => ".flv",
        _ => ".bin",
    }
}

/// Owns a remote asset until it is released.
///
/// Call [`release`](Self::release) on every normal exit. A guard dropped
/// unreleased (the run future was cancelled) spawns the deletion onto the
/// current runtime instead.
pub struct RemoteAssetGuard {
    client: Arc<dyn RemoteAnalysisClient>,
    asset_name: Option<String>,
}

impl RemoteAssetGuard {
    pub fn new(client: Arc<dyn RemoteAnalysisClient>, asset_name: String) -> Self {
        Self {
            client,
            asset_name: Some(asset_name),
        }
    }

    /// Delete the asset. Returns false if deletion failed; never errors.
    pub async fn release(mut self) -> bool {
        let Some(name) = self.asset_name.take() else {
            return true;
        };
        match self.client.delete_asset(&name).await {
            Ok(()) => {
                debug!(asset = %name, "Remote asset deleted");
                true
            }
            Err(e) => {
                warn!(asset = %name, error = %e, "Failed to delete remote asset");
                false
            }
        }
    }
}

impl Drop for RemoteAssetGuard {
    fn drop(&mut self) {
        let Some(name) = self.asset_name.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = Arc::clone(&self.client);
                handle.spawn(async move {
                    if let Err(e) = client.delete_asset(&name).await {
                        warn!(asset = %name, error = %e, "Deferred asset deletion failed");
                    }
                });
            }
            Err(_) => warn!(asset = %name, "No runtime to delete remote asset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LifecycleConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_poll_attempts, 300);
        assert_eq!(config.quota_backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_config_builders() {
        let config = LifecycleConfig::default()
            .with_poll_interval(Duration::from_millis(10))
            .with_max_poll_attempts(3)
            .with_quota_backoff(Duration::from_secs(1));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.max_poll_attempts, 3);
        assert_eq!(config.quota_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("video/mp4"), ".mp4");
        assert_eq!(extension_for_mime("VIDEO/QuickTime"), ".mov");
        assert_eq!(extension_for_mime("video/webm; codecs=vp9"), ".webm");
        assert_eq!(extension_for_mime("video/unknown"), ".bin");
    }

    #[tokio::test]
    async fn test_temp_files_are_unique_per_run() {
        let a = write_temp_file(Uuid::now_v7(), b"one", "video/mp4").await.unwrap();
        let b = write_temp_file(Uuid::now_v7(), b"two", "video/mp4").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"one");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"two");

        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(TEMP_FILE_PREFIX));
        assert!(name.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_large_upload_written_intact() {
        let data: Vec<u8> = (0..5 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let file = write_temp_file(Uuid::now_v7(), &data, "video/webm").await.unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), data);
    }

    #[tokio::test]
    async fn test_temp_file_removed_on_drop() {
        let file = write_temp_file(Uuid::now_v7(), b"data", "video/mp4").await.unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }
}
