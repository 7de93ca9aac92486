//! Core traits for docbridge abstractions.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    Document, DocumentPatch, DocumentQuery, Error, MetadataKind, NamedItem, Result, Thumbnail,
};

// =============================================================================
// DOCUMENT STORE
// =============================================================================

/// Typed access to the document-management REST API.
///
/// Implementations hold no shared mutable state beyond configuration and are
/// safe to call concurrently.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    ///
    /// Fails with [`Error::NotFound`] if the ID is unknown or the request
    /// could not be completed.
    async fn fetch_document(&self, id: i64) -> Result<Document>;

    /// Lazily stream every document matching `query`, page by page.
    ///
    /// Each call starts from the first page. The stream ends after yielding
    /// the first error.
    fn search_documents(&self, query: DocumentQuery) -> BoxStream<'_, Result<Document>>;

    /// Apply a partial update.
    ///
    /// Returns `Ok(false)` when the store rejected the update with a non-2xx
    /// status; `Err` is reserved for transport failures.
    async fn patch_document(&self, id: i64, patch: &DocumentPatch) -> Result<bool>;

    /// Fetch the complete `{id, name}` listing of a metadata kind.
    async fn list_all(&self, kind: MetadataKind) -> Result<Vec<NamedItem>>;

    /// Fetch the preview image of a document.
    async fn fetch_thumbnail(&self, id: i64) -> Result<Thumbnail> {
        Err(Error::NotFound(format!("thumbnail for document {}", id)))
    }
}

// =============================================================================
// INFERENCE
// =============================================================================

/// Language-model backend that extracts field values from document text.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Extract one value from `content` following `instruction`.
    ///
    /// A reply that does not match the expected schema is returned as
    /// [`Error::MalformedResponse`].
    async fn extract_field(&self, content: &str, instruction: &str) -> Result<String>;

    /// Make sure the model is available and answering.
    ///
    /// `Ok(false)` means the model could not be made available; `Err` means
    /// the model is present but the test round-trip failed.
    async fn self_check(&self) -> Result<bool>;

    /// Name of the model used for extraction.
    fn model_name(&self) -> &str;
}
