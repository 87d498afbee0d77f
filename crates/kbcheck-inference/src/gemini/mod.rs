//! Gemini (Google Generative Language API) client.
//!
//! Implements [`kbcheck_core::RemoteAnalysisClient`] over the Files API
//! (upload, status, delete) and `models/{model}:generateContent`.
//!
//! # Example
//!
//! ```rust,no_run
//! use kbcheck_core::{MediaInput, RemoteAnalysisClient};
//! use kbcheck_inference::gemini::{GeminiClient, GeminiConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     // From environment variables (GEMINI_API_KEY / GOOGLE_API_KEY)
//!     let client = GeminiClient::from_env().unwrap();
//!
//!     // Or with explicit config
//!     let client = GeminiClient::new(
//!         GeminiConfig::new("my-key").with_model("gemini-1.5-pro"),
//!     )
//!     .unwrap();
//!
//!     let answer = client
//!         .run_prompt(&MediaInput::TextOnly, "Say hello")
//!         .await
//!         .unwrap();
//!     println!("{}", answer);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{GeminiClient, GeminiConfig};
pub use error::{to_kbcheck_error, GeminiErrorCode};
pub use types::*;
