//! # docbridge-store
//!
//! Document store access for docbridge.
//!
//! This crate provides:
//! - [`PaperlessClient`]: typed client for the Paperless REST API
//! - [`MetadataCache`]: time-boxed name/ID cache for tags, correspondents,
//!   document types and storage paths
//! - [`TagResolver`]: applies add/remove tag directives as a single update
//!
//! # Feature Flags
//!
//! - `memory`: in-memory [`DocumentStore`](docbridge_core::DocumentStore)
//!   used by tests across the workspace
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use docbridge_store::{MetadataCache, PaperlessClient, TagResolver};
//!
//! # async fn run() -> docbridge_core::Result<()> {
//! let store = Arc::new(PaperlessClient::new("http://paperless:8000/api", "token")?);
//! let cache = MetadataCache::new(store.clone(), Duration::from_secs(3600));
//! let resolver = TagResolver::new(store, cache);
//! resolver
//!     .apply_tag_directives(42, &["ai-processed".to_string(), "-Inbox".to_string()])
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod paperless;
pub mod tag_resolver;

pub use cache::MetadataCache;
#[cfg(any(test, feature = "memory"))]
pub use memory::InMemoryStore;
pub use paperless::PaperlessClient;
pub use tag_resolver::{merge_tags, TagResolver};
