//! # kbcheck-inference
//!
//! Generative-AI service client for kbcheck.
//!
//! This crate provides:
//! - Gemini implementation of [`kbcheck_core::RemoteAnalysisClient`]
//!   (file upload, status polling, generation, deletion, model listing)
//! - Error classification that separates quota exhaustion from other
//!   transport failures
//! - Model discovery diagnostic
//! - Scripted mock client (feature `mock`)
//!
//! # Feature Flags
//!
//! - `mock`: Enable [`mock::MockAnalysisClient`] for tests in dependent crates

pub mod discovery;
pub mod gemini;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use kbcheck_core::*;

pub use discovery::{DiscoveryResult, ModelDiscovery};
pub use gemini::{GeminiClient, GeminiConfig, GeminiErrorCode};
