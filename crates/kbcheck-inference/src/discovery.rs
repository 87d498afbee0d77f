//! Model discovery diagnostic.
//!
//! Confirms the configured credential works and lists which models it can
//! use for content generation.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kbcheck_inference::discovery::ModelDiscovery;
//! use kbcheck_inference::gemini::GeminiClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(GeminiClient::from_env().unwrap());
//!     let result = ModelDiscovery::new(client).discover().await.unwrap();
//!     println!("{}", result.summary());
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kbcheck_core::defaults::GENERATE_CONTENT_METHOD;
use kbcheck_core::{ModelInfo, RemoteAnalysisClient, Result};

/// Result of model discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Models usable for content generation, in service order.
    pub models: Vec<ModelInfo>,
    /// Names of the generation-capable models.
    pub generation_models: Vec<String>,
    /// Total models the service returned before filtering.
    pub total_listed: usize,
    /// Model currently configured for analysis.
    pub configured_model: String,
    /// Whether the configured model appears among the generation models.
    pub configured_model_available: bool,
    /// Discovery timestamp.
    pub discovered_at: String,
}

impl DiscoveryResult {
    pub fn has_generation_models(&self) -> bool {
        !self.generation_models.is_empty()
    }

    /// One-line operator-facing summary.
    pub fn summary(&self) -> String {
        if self.has_generation_models() {
            format!(
                "Found {} model(s) supporting {} ({} listed)",
                self.generation_models.len(),
                GENERATE_CONTENT_METHOD,
                self.total_listed
            )
        } else {
            format!(
                "No models supporting {} were found. Check the API key's permissions.",
                GENERATE_CONTENT_METHOD
            )
        }
    }
}

/// Runs the discovery against a remote client.
pub struct ModelDiscovery {
    client: Arc<dyn RemoteAnalysisClient>,
}

impl ModelDiscovery {
    pub fn new(client: Arc<dyn RemoteAnalysisClient>) -> Self {
        Self { client }
    }

    pub async fn discover(&self) -> Result<DiscoveryResult> {
        let listed = self.client.list_models().await?;
        let total_listed = listed.len();

        let models: Vec<ModelInfo> = listed
            .into_iter()
            .filter(|m| m.supports(GENERATE_CONTENT_METHOD))
            .collect();
        let generation_models: Vec<String> = models.iter().map(|m| m.name.clone()).collect();

        let configured_model = self.client.model_name().to_string();
        let configured_model_available = generation_models
            .iter()
            .any(|name| is_same_model(name, &configured_model));

        if generation_models.is_empty() {
            warn!(total_listed, "No generation-capable models available");
        } else {
            info!(
                count = generation_models.len(),
                total_listed, configured_model_available, "Model discovery complete"
            );
        }

        Ok(DiscoveryResult {
            models,
            generation_models,
            total_listed,
            configured_model,
            configured_model_available,
            discovered_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Compare model names ignoring the `models/` prefix.
fn is_same_model(a: &str, b: &str) -> bool {
    a.trim_start_matches("models/") == b.trim_start_matches("models/")
}
