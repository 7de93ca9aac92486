//! Tag directive application.
//!
//! Resolves tag names through the [`MetadataCache`] and applies all
//! additions and removals of one call as a single document update.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use docbridge_core::{
    DocumentPatch, DocumentStore, Error, MetadataKind, Result, TagAction, TagDirective,
};

use crate::MetadataCache;

/// Applies `name` / `-name` tag directives to documents.
#[derive(Clone)]
pub struct TagResolver {
    store: Arc<dyn DocumentStore>,
    cache: MetadataCache,
}

impl TagResolver {
    pub fn new(store: Arc<dyn DocumentStore>, cache: MetadataCache) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Parse and apply raw directives such as `["ai-processed", "-Inbox"]`.
    ///
    /// Fails with [`Error::NotFound`] before touching the document if any tag
    /// name is unknown. Otherwise returns the result of the single patch.
    pub async fn apply_tag_directives(&self, document_id: i64, directives: &[String]) -> Result<bool> {
        let parsed = TagDirective::parse_all(directives)?;
        self.apply(document_id, &parsed).await
    }

    /// Apply already-parsed directives.
    #[instrument(skip(self, directives), fields(subsystem = "store", component = "tag_resolver", op = "apply_tag_directives"))]
    pub async fn apply(&self, document_id: i64, directives: &[TagDirective]) -> Result<bool> {
        let mut to_add = Vec::new();
        let mut to_remove = Vec::new();

        for directive in directives {
            let tag_id = self
                .cache
                .resolve_name_to_id(MetadataKind::Tag, &directive.name)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Tag '{}' does not exist", directive.name)))?;
            match directive.action {
                TagAction::Add => to_add.push(tag_id),
                TagAction::Remove => to_remove.push(tag_id),
            }
        }

        let document = self.store.fetch_document(document_id).await?;
        let tags = merge_tags(&document.tags, &to_add, &to_remove);
        debug!(
            before = ?document.tags,
            after = ?tags,
            "Applying tag directives"
        );

        let updated = self
            .store
            .patch_document(document_id, &DocumentPatch::new().with_tags(tags))
            .await?;
        if !updated {
            warn!("Tag update was rejected by the document store");
        }
        Ok(updated)
    }
}

/// Compute the new tag set: drop `remove`, then append `add` IDs that are not
/// already present. Existing order is kept.
pub fn merge_tags(current: &[i64], add: &[i64], remove: &[i64]) -> Vec<i64> {
    let mut tags: Vec<i64> = current
        .iter()
        .copied()
        .filter(|id| !remove.contains(id))
        .collect();
    for id in add {
        if !tags.contains(id) {
            tags.push(*id);
        }
    }
    tags
}
