//! # kbcheck-jobs
//!
//! Request-scoped work for kbcheck.
//!
//! This crate provides:
//! - The upload lifecycle controller (save, upload, poll, analyze, cleanup)
//!   with a single quota retry and scoped release of the temp file and the
//!   remote asset
//! - Progress reporting at fixed checkpoints
//! - The knowledge-base chat service
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kbcheck_jobs::{KnowledgeStore, LifecycleConfig, UploadLifecycle};
//! use kbcheck_inference::GeminiClient;
//!
//! let client = Arc::new(GeminiClient::from_env()?);
//! let lifecycle = UploadLifecycle::new(client, KnowledgeStore::from_env(), LifecycleConfig::from_env());
//!
//! let report = lifecycle.run(&bytes, "video/mp4", None).await?;
//! println!("{}", report.text);
//! ```

pub mod chat;
pub mod lifecycle;

// Re-export core types
pub use kbcheck_core::*;

pub use chat::ChatService;
pub use lifecycle::{LifecycleConfig, ProgressCallback, RemoteAssetGuard, UploadLifecycle};
