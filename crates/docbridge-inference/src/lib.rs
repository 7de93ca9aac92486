//! # docbridge-inference
//!
//! Language-model extraction backend for docbridge.
//!
//! This crate provides:
//! - [`OllamaBackend`]: [`ExtractionBackend`](docbridge_core::ExtractionBackend)
//!   over the Ollama chat API, with schema-constrained replies
//! - Prompt construction and reply parsing ([`prompt`])
//! - Model pull with streamed progress as part of the startup self-check
//!
//! # Feature Flags
//!
//! - `mock`: deterministic [`MockExtractionBackend`] for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use docbridge_core::ExtractionBackend;
//! use docbridge_inference::OllamaBackend;
//!
//! # async fn run() -> docbridge_core::Result<()> {
//! let backend = OllamaBackend::new("http://localhost:11434", "gemma2:9b")?;
//! if backend.self_check().await? {
//!     let title = backend
//!         .extract_field("Invoice no. 117 ...", "Extract a short title")
//!         .await?;
//!     println!("{}", title);
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ollama;
pub mod prompt;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockExtractionBackend;
pub use ollama::OllamaBackend;
pub use prompt::{ChatMessage, SYSTEM_PROMPT};
