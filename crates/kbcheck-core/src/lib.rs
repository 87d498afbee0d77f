//! # kbcheck-core
//!
//! Core types, traits, and abstractions for kbcheck.
//!
//! This crate provides the error taxonomy, shared defaults, the knowledge
//! base store and prompt templates, and the [`RemoteAnalysisClient`] trait
//! that the other kbcheck crates depend on.

pub mod defaults;
pub mod error;
pub mod knowledge;
pub mod logging;
pub mod models;
pub mod prompts;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use knowledge::{KnowledgeDocument, KnowledgeStore};
pub use models::*;
pub use traits::*;
