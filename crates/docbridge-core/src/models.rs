//! Data models shared across docbridge crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::FieldInstruction;

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Snapshot of a document held by the document store.
///
/// Only the attributes docbridge reads or writes are modelled; everything else
/// in the store's JSON is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    /// Extracted text content.
    #[serde(default)]
    pub content: String,
    /// Assigned tag IDs.
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub correspondent: Option<i64>,
    #[serde(default)]
    pub document_type: Option<i64>,
    #[serde(default)]
    pub storage_path: Option<i64>,
}

impl Document {
    /// Check whether a tag ID is assigned to this document.
    pub fn has_tag(&self, tag_id: i64) -> bool {
        self.tags.contains(&tag_id)
    }
}

/// Partial document update. Only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<i64>>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the document's full tag set.
    pub fn with_tags(mut self, tags: Vec<i64>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.tags.is_none()
    }
}

/// Filter for document searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Case-insensitive exact tag name match.
    pub tag_name: Option<String>,
    /// Ordering expression, e.g. `-modified`.
    pub ordering: Option<String>,
}

impl DocumentQuery {
    /// Documents carrying the given tag name.
    pub fn tagged(name: impl Into<String>) -> Self {
        Self {
            tag_name: Some(name.into()),
            ordering: None,
        }
    }

    pub fn ordered_by(mut self, ordering: impl Into<String>) -> Self {
        self.ordering = Some(ordering.into());
        self
    }

    /// Query-string pairs understood by the document store.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref name) = self.tag_name {
            pairs.push(("tags__name__iexact", name.clone()));
        }
        if let Some(ref ordering) = self.ordering {
            pairs.push(("ordering", ordering.clone()));
        }
        pairs
    }
}

/// Document preview image returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// METADATA
// =============================================================================

/// An `{id, name}` pair: tag, correspondent, document type or storage path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedItem {
    pub id: i64,
    pub name: String,
}

impl NamedItem {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Kinds of named metadata kept in the metadata cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    Tag,
    Correspondent,
    DocumentType,
    StoragePath,
}

impl MetadataKind {
    pub const ALL: [MetadataKind; 4] = [
        MetadataKind::Tag,
        MetadataKind::Correspondent,
        MetadataKind::DocumentType,
        MetadataKind::StoragePath,
    ];

    /// Collection path of this kind in the document store API.
    pub fn endpoint(&self) -> &'static str {
        match self {
            MetadataKind::Tag => "tags",
            MetadataKind::Correspondent => "correspondents",
            MetadataKind::DocumentType => "document_types",
            MetadataKind::StoragePath => "storage_paths",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKind::Tag => "tag",
            MetadataKind::Correspondent => "correspondent",
            MetadataKind::DocumentType => "document_type",
            MetadataKind::StoragePath => "storage_path",
        }
    }

    /// Position of this kind in [`MetadataKind::ALL`].
    pub fn index(&self) -> usize {
        match self {
            MetadataKind::Tag => 0,
            MetadataKind::Correspondent => 1,
            MetadataKind::DocumentType => 2,
            MetadataKind::StoragePath => 3,
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paginated list envelope used by the document store.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    /// Absolute URL of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

// =============================================================================
// QUEUE
// =============================================================================

/// One unit of work handed from intake to the processing worker.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Log correlation ID (UUIDv7).
    pub id: Uuid,
    /// Document snapshot taken at intake time.
    pub document: Document,
    pub client_ip: String,
    /// Fields to extract, in extraction order.
    pub fields: Vec<FieldInstruction>,
    /// Call tag that triggered the webhook.
    pub tag: Option<String>,
}

impl QueueEntry {
    pub fn new(
        document: Document,
        client_ip: impl Into<String>,
        fields: Vec<FieldInstruction>,
        tag: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            document,
            client_ip: client_ip.into(),
            fields,
            tag,
        }
    }

    pub fn document_id(&self) -> i64 {
        self.document.id
    }
}
