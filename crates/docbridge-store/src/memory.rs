//! In-memory document store for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docbridge_core::{Document, MetadataKind};
//! use docbridge_store::InMemoryStore;
//!
//! let store = InMemoryStore::new()
//!     .with_item(MetadataKind::Tag, 1, "Inbox")
//!     .with_document(Document {
//!         id: 42,
//!         title: "scan_0042".to_string(),
//!         content: "Invoice ...".to_string(),
//!         tags: vec![1],
//!         correspondent: None,
//!         document_type: None,
//!         storage_path: None,
//!     });
//! assert_eq!(store.document(42).unwrap().tags, vec![1]);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use docbridge_core::{
    Document, DocumentPatch, DocumentQuery, DocumentStore, Error, MetadataKind, NamedItem, Result,
    Thumbnail,
};

/// Document store backed by in-process maps.
///
/// Records how often each metadata kind was listed and every patch that was
/// attempted, so tests can assert on store traffic.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    documents: BTreeMap<i64, Document>,
    metadata: HashMap<MetadataKind, Vec<NamedItem>>,
    thumbnails: HashMap<i64, Thumbnail>,
    list_calls: HashMap<MetadataKind, usize>,
    patches: Vec<(i64, DocumentPatch)>,
    reject_patches: bool,
    reject_title_updates: bool,
    fail_listings: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_document(self, document: Document) -> Self {
        self.insert_document(document);
        self
    }

    pub fn with_item(self, kind: MetadataKind, id: i64, name: &str) -> Self {
        self.insert_item(kind, id, name);
        self
    }

    pub fn with_thumbnail(self, id: i64, content_type: &str, bytes: Vec<u8>) -> Self {
        self.state().thumbnails.insert(
            id,
            Thumbnail {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        self
    }

    pub fn insert_document(&self, document: Document) {
        self.state().documents.insert(document.id, document);
    }

    pub fn insert_item(&self, kind: MetadataKind, id: i64, name: &str) {
        self.state()
            .metadata
            .entry(kind)
            .or_default()
            .push(NamedItem::new(id, name));
    }

    /// Current stored version of a document.
    pub fn document(&self, id: i64) -> Option<Document> {
        self.state().documents.get(&id).cloned()
    }

    /// Names of the tags currently assigned to a document.
    pub fn tag_names(&self, id: i64) -> Vec<String> {
        let state = self.state();
        let Some(document) = state.documents.get(&id) else {
            return Vec::new();
        };
        let tags = state.metadata.get(&MetadataKind::Tag);
        document
            .tags
            .iter()
            .filter_map(|tag_id| {
                tags.and_then(|items| items.iter().find(|item| item.id == *tag_id))
                    .map(|item| item.name.clone())
            })
            .collect()
    }

    /// Number of `list_all` calls made for a kind.
    pub fn list_calls(&self, kind: MetadataKind) -> usize {
        self.state().list_calls.get(&kind).copied().unwrap_or(0)
    }

    /// Every patch attempted so far, in order.
    pub fn patches(&self) -> Vec<(i64, DocumentPatch)> {
        self.state().patches.clone()
    }

    /// Make every patch fail with a non-2xx result.
    pub fn set_reject_patches(&self, reject: bool) {
        self.state().reject_patches = reject;
    }

    /// Make patches that change the title fail; tag-only patches still apply.
    pub fn set_reject_title_updates(&self, reject: bool) {
        self.state().reject_title_updates = reject;
    }

    /// Make every metadata listing fail with an upstream error.
    pub fn set_fail_listings(&self, fail: bool) {
        self.state().fail_listings = fail;
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn fetch_document(&self, id: i64) -> Result<Document> {
        self.document(id)
            .ok_or_else(|| Error::NotFound(format!("Document {} does not exist", id)))
    }

    fn search_documents(&self, query: DocumentQuery) -> BoxStream<'_, Result<Document>> {
        let state = self.state();
        let tag_id = query.tag_name.as_ref().map(|name| {
            state
                .metadata
                .get(&MetadataKind::Tag)
                .and_then(|items| items.iter().find(|item| item.name.eq_ignore_ascii_case(name)))
                .map(|item| item.id)
        });

        let mut documents: Vec<Document> = state
            .documents
            .values()
            .filter(|doc| match tag_id {
                None => true,
                Some(Some(id)) => doc.has_tag(id),
                Some(None) => false,
            })
            .cloned()
            .collect();
        if query.ordering.as_deref().is_some_and(|o| o.starts_with('-')) {
            documents.reverse();
        }

        stream::iter(documents.into_iter().map(Ok)).boxed()
    }

    async fn patch_document(&self, id: i64, patch: &DocumentPatch) -> Result<bool> {
        let mut state = self.state();
        state.patches.push((id, patch.clone()));
        if state.reject_patches || (state.reject_title_updates && patch.title.is_some()) {
            return Ok(false);
        }
        let Some(document) = state.documents.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(ref title) = patch.title {
            document.title = title.clone();
        }
        if let Some(ref tags) = patch.tags {
            document.tags = tags.clone();
        }
        Ok(true)
    }

    async fn list_all(&self, kind: MetadataKind) -> Result<Vec<NamedItem>> {
        let mut state = self.state();
        *state.list_calls.entry(kind).or_default() += 1;
        if state.fail_listings {
            return Err(Error::Request(format!("listing {} failed", kind)));
        }
        Ok(state.metadata.get(&kind).cloned().unwrap_or_default())
    }

    async fn fetch_thumbnail(&self, id: i64) -> Result<Thumbnail> {
        self.state()
            .thumbnails
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Thumbnail for document {}", id)))
    }
}
