//! Processing of a single queue entry.
//!
//! Order of operations for one entry:
//! 1. extract every requested field, one after another
//! 2. write the extracted values back in one document update
//! 3. remove the call tag (if the entry carries one)
//! 4. apply the outcome tag: the processing tag when step 2 succeeded,
//!    otherwise the error tag; the other outcome tag, if it exists, is removed in the
//!    same update so a document never carries both
//!
//! Steps 3 and 4 run even when 1 or 2 failed. Their own failures are logged
//! and never retried.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use docbridge_core::{
    defaults, DocumentPatch, DocumentStore, ExtractableField, ExtractionBackend, MetadataKind,
    QueueEntry, Result, TagDirective,
};
use docbridge_store::TagResolver;

/// Outcome tags written after processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingConfig {
    /// Applied when the field update succeeded.
    pub processing_tag: String,
    /// Applied when extraction or the field update failed.
    pub error_tag: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            processing_tag: defaults::PROCESSING_TAG.to_string(),
            error_tag: defaults::ERROR_TAG.to_string(),
        }
    }
}

impl ProcessingConfig {
    pub fn new(processing_tag: impl Into<String>, error_tag: impl Into<String>) -> Self {
        Self {
            processing_tag: processing_tag.into(),
            error_tag: error_tag.into(),
        }
    }

    /// Directives for the final tag update.
    pub fn outcome_directives(&self, success: bool) -> Vec<TagDirective> {
        if success {
            vec![
                TagDirective::add(&self.processing_tag),
                TagDirective::remove(&self.error_tag),
            ]
        } else {
            vec![
                TagDirective::add(&self.error_tag),
                TagDirective::remove(&self.processing_tag),
            ]
        }
    }
}

/// Result of processing one entry. Only used for logging and events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingOutcome {
    /// Values returned by the model, in extraction order.
    pub extracted: Vec<(ExtractableField, String)>,
    /// The document update with the extracted values was accepted.
    pub fields_updated: bool,
    pub call_tag_removed: bool,
    pub outcome_tag_applied: bool,
    /// Error that aborted extraction or the field update.
    pub error: Option<String>,
}

impl ProcessingOutcome {
    pub fn succeeded(&self) -> bool {
        self.fields_updated && self.error.is_none()
    }

    /// Short description of why processing failed.
    pub fn failure_reason(&self) -> Option<String> {
        if self.succeeded() {
            None
        } else {
            Some(
                self.error
                    .clone()
                    .unwrap_or_else(|| "Field update rejected by the document store".to_string()),
            )
        }
    }
}

/// Runs the extraction pipeline for queue entries.
pub struct EntryProcessor {
    store: Arc<dyn DocumentStore>,
    backend: Arc<dyn ExtractionBackend>,
    tags: TagResolver,
    config: ProcessingConfig,
}

impl EntryProcessor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        backend: Arc<dyn ExtractionBackend>,
        tags: TagResolver,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            store,
            backend,
            tags,
            config,
        }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Process one entry end to end. Never fails; problems are recorded in
    /// the returned outcome.
    #[instrument(skip(self, entry), fields(subsystem = "jobs", component = "processor", op = "process", entry_id = %entry.id, document_id = entry.document.id))]
    pub async fn process(&self, entry: &QueueEntry) -> ProcessingOutcome {
        let mut outcome = ProcessingOutcome::default();

        match self.update_fields(entry, &mut outcome.extracted).await {
            Ok(updated) => outcome.fields_updated = updated,
            Err(e) => {
                error!(error = %e, "Field extraction failed");
                outcome.error = Some(e.to_string());
            }
        }

        self.finish(entry, &mut outcome).await;
        outcome
    }

    /// Tag bookkeeping for an entry whose processing was aborted.
    #[instrument(skip(self, entry), fields(subsystem = "jobs", component = "processor", op = "recover", entry_id = %entry.id, document_id = entry.document.id))]
    pub async fn recover(&self, entry: &QueueEntry, error: String) -> ProcessingOutcome {
        let mut outcome = ProcessingOutcome {
            error: Some(error),
            ..Default::default()
        };
        self.finish(entry, &mut outcome).await;
        outcome
    }

    async fn finish(&self, entry: &QueueEntry, outcome: &mut ProcessingOutcome) {
        outcome.call_tag_removed = self.remove_call_tag(entry).await;
        outcome.outcome_tag_applied = self
            .apply_outcome_tag(entry.document.id, outcome.succeeded())
            .await;
    }

    /// Extract all fields, then write them in one update.
    async fn update_fields(
        &self,
        entry: &QueueEntry,
        extracted: &mut Vec<(ExtractableField, String)>,
    ) -> Result<bool> {
        for field in &entry.fields {
            let start = Instant::now();
            let value = self
                .backend
                .extract_field(&entry.document.content, &field.instruction)
                .await?;
            info!(
                field = %field.field,
                value_len = value.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Field extracted"
            );
            extracted.push((field.field, value));
        }

        if extracted.is_empty() {
            debug!("No fields requested, skipping field update");
            return Ok(true);
        }

        let mut patch = DocumentPatch::new();
        for (field, value) in extracted.iter() {
            field.apply(&mut patch, value);
        }

        let updated = self.store.patch_document(entry.document.id, &patch).await?;
        if !updated {
            warn!("Field update rejected by the document store");
        }
        Ok(updated)
    }

    /// Remove the call tag. Returns whether the removal was applied.
    async fn remove_call_tag(&self, entry: &QueueEntry) -> bool {
        let Some(ref call_tag) = entry.tag else {
            return false;
        };

        match self
            .tags
            .cache()
            .resolve_name_to_id(MetadataKind::Tag, call_tag)
            .await
        {
            Ok(Some(tag_id)) if !entry.document.has_tag(tag_id) => {
                warn!(call_tag = %call_tag, "Call tag is not assigned to the document");
            }
            Ok(None) => {
                warn!(call_tag = %call_tag, "Call tag does not exist in the document store");
                return false;
            }
            // The removal below reports lookup failures
            _ => {}
        }

        match self
            .tags
            .apply(entry.document.id, &[TagDirective::remove(call_tag)])
            .await
        {
            Ok(true) => {
                debug!(call_tag = %call_tag, "Call tag removed");
                true
            }
            Ok(false) => {
                warn!(call_tag = %call_tag, "Call tag removal rejected");
                false
            }
            Err(e) => {
                warn!(call_tag = %call_tag, error = %e, "Failed to remove call tag");
                false
            }
        }
    }

    /// Apply the processing or error tag. Returns whether it was applied.
    async fn apply_outcome_tag(&self, document_id: i64, success: bool) -> bool {
        let (tag, opposite) = if success {
            (&self.config.processing_tag, &self.config.error_tag)
        } else {
            (&self.config.error_tag, &self.config.processing_tag)
        };

        // The resolver rejects unknown names, so an opposite tag that was
        // never created is not removed
        let mut directives = self.config.outcome_directives(success);
        if let Ok(None) = self
            .tags
            .cache()
            .resolve_name_to_id(MetadataKind::Tag, opposite)
            .await
        {
            debug!(tag = %opposite, "Opposite outcome tag does not exist, skipping its removal");
            directives.retain(|directive| !directive.is_removal());
        }

        match self.tags.apply(document_id, &directives).await {
            Ok(true) => {
                debug!(tag = %tag, "Outcome tag applied");
                true
            }
            Ok(false) => {
                error!(tag = %tag, "Outcome tag update rejected");
                false
            }
            Err(e) => {
                error!(tag = %tag, error = %e, "Failed to apply outcome tag");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbridge_core::{Document, FieldInstruction};
    use docbridge_inference::mock::{MockExtractionBackend, MockReply};
    use docbridge_store::{InMemoryStore, MetadataCache};
    use std::time::Duration;

    const INBOX: i64 = 1;
    const PROCESSED: i64 = 2;
    const ERROR: i64 = 3;
    const CALL: i64 = 4;

    fn document(id: i64, tags: Vec<i64>) -> Document {
        Document {
            id,
            title: format!("scan_{:04}", id),
            content: format!("Invoice no. {} from ACME Corp", id),
            tags,
            correspondent: None,
            document_type: None,
            storage_path: None,
        }
    }

    fn setup(backend: MockExtractionBackend, doc: Document) -> (Arc<InMemoryStore>, EntryProcessor) {
        let store = Arc::new(
            InMemoryStore::new()
                .with_item(MetadataKind::Tag, INBOX, "Inbox")
                .with_item(MetadataKind::Tag, PROCESSED, "ai-processed")
                .with_item(MetadataKind::Tag, ERROR, "ai-error")
                .with_item(MetadataKind::Tag, CALL, "webhook-call")
                .with_document(doc),
        );
        let cache = MetadataCache::new(store.clone(), Duration::from_secs(60));
        let resolver = TagResolver::new(store.clone(), cache);
        let processor = EntryProcessor::new(
            store.clone(),
            Arc::new(backend),
            resolver,
            ProcessingConfig::default(),
        );
        (store, processor)
    }

    fn title_entry(doc: Document, tag: Option<&str>) -> QueueEntry {
        QueueEntry::new(
            doc,
            "10.0.0.8",
            vec![FieldInstruction {
                field: ExtractableField::Title,
                instruction: "Extract a short title".to_string(),
            }],
            tag.map(str::to_string),
        )
    }

    #[test]
    fn test_outcome_directives() {
        let config = ProcessingConfig::default();
        let success: Vec<String> = config
            .outcome_directives(true)
            .iter()
            .map(|d| d.to_string())
            .collect();
        let failure: Vec<String> = config
            .outcome_directives(false)
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(success, vec!["ai-processed", "-ai-error"]);
        assert_eq!(failure, vec!["ai-error", "-ai-processed"]);
    }

    #[test]
    fn test_failure_reason() {
        let ok = ProcessingOutcome {
            fields_updated: true,
            ..Default::default()
        };
        assert!(ok.succeeded());
        assert!(ok.failure_reason().is_none());

        let rejected = ProcessingOutcome::default();
        assert!(rejected.failure_reason().unwrap().contains("rejected"));
    }

    #[tokio::test]
    async fn test_success_updates_title_and_tags() {
        let doc = document(42, vec![INBOX, CALL]);
        let backend = MockExtractionBackend::new().with_default_response(" ACME invoice 42 ");
        let (store, processor) = setup(backend, doc.clone());

        let outcome = processor
            .process(&title_entry(doc, Some("webhook-call")))
            .await;

        assert!(outcome.succeeded());
        assert!(outcome.call_tag_removed);
        assert!(outcome.outcome_tag_applied);
        assert_eq!(
            outcome.extracted,
            vec![(ExtractableField::Title, " ACME invoice 42 ".to_string())]
        );

        let stored = store.document(42).unwrap();
        assert_eq!(stored.title, "ACME invoice 42");
        assert_eq!(stored.tags, vec![INBOX, PROCESSED]);
    }

    #[tokio::test]
    async fn test_call_tag_removed_before_outcome_tag() {
        let doc = document(42, vec![CALL]);
        let (store, processor) = setup(MockExtractionBackend::new(), doc.clone());

        processor
            .process(&title_entry(doc, Some("webhook-call")))
            .await;

        let patches = store.patches();
        assert_eq!(patches.len(), 3);
        assert!(patches[0].1.title.is_some());
        assert_eq!(patches[1].1.tags, Some(vec![]));
        assert_eq!(patches[2].1.tags, Some(vec![PROCESSED]));
    }

    #[tokio::test]
    async fn test_malformed_reply_applies_error_tag() {
        let doc = document(42, vec![INBOX, CALL]);
        let backend = MockExtractionBackend::new().with_default_reply(MockReply::Malformed);
        let (store, processor) = setup(backend, doc.clone());

        let outcome = processor
            .process(&title_entry(doc, Some("webhook-call")))
            .await;

        assert!(!outcome.succeeded());
        assert!(outcome.error.unwrap().contains("Malformed response"));
        let stored = store.document(42).unwrap();
        assert_eq!(stored.title, "scan_0042");
        assert_eq!(stored.tags, vec![INBOX, ERROR]);
    }

    #[tokio::test]
    async fn test_rejected_field_update_applies_error_tag() {
        let doc = document(42, vec![CALL]);
        let (store, processor) = setup(MockExtractionBackend::new(), doc.clone());
        store.set_reject_title_updates(true);

        let outcome = processor
            .process(&title_entry(doc, Some("webhook-call")))
            .await;

        assert!(!outcome.fields_updated);
        assert!(outcome.error.is_none());
        assert_eq!(store.document(42).unwrap().tags, vec![ERROR]);
    }

    #[tokio::test]
    async fn test_success_clears_previous_error_tag() {
        let doc = document(42, vec![ERROR, CALL]);
        let (store, processor) = setup(MockExtractionBackend::new(), doc.clone());

        processor
            .process(&title_entry(doc, Some("webhook-call")))
            .await;

        assert_eq!(store.document(42).unwrap().tags, vec![PROCESSED]);
    }

    #[tokio::test]
    async fn test_unassigned_call_tag_is_not_fatal() {
        let doc = document(42, vec![INBOX]);
        let (store, processor) = setup(MockExtractionBackend::new(), doc.clone());

        let outcome = processor
            .process(&title_entry(doc, Some("webhook-call")))
            .await;

        assert!(outcome.succeeded());
        assert_eq!(store.document(42).unwrap().tags, vec![INBOX, PROCESSED]);
    }

    #[tokio::test]
    async fn test_unknown_call_tag_still_applies_outcome() {
        let doc = document(42, vec![INBOX]);
        let (store, processor) = setup(MockExtractionBackend::new(), doc.clone());

        let outcome = processor
            .process(&title_entry(doc, Some("no-such-tag")))
            .await;

        assert!(!outcome.call_tag_removed);
        assert!(outcome.outcome_tag_applied);
        assert_eq!(store.document(42).unwrap().tags, vec![INBOX, PROCESSED]);
    }

    #[tokio::test]
    async fn test_without_call_tag() {
        let doc = document(42, vec![]);
        let (store, processor) = setup(MockExtractionBackend::new(), doc.clone());

        let outcome = processor.process(&title_entry(doc, None)).await;

        assert!(!outcome.call_tag_removed);
        assert!(outcome.succeeded());
        assert_eq!(store.document(42).unwrap().tags, vec![PROCESSED]);
    }

    #[tokio::test]
    async fn test_recover_applies_error_tag() {
        let doc = document(42, vec![CALL, PROCESSED]);
        let (store, processor) = setup(MockExtractionBackend::new(), doc.clone());

        let outcome = processor
            .recover(&title_entry(doc, Some("webhook-call")), "panic: boom".to_string())
            .await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.failure_reason().unwrap(), "panic: boom");
        assert_eq!(store.document(42).unwrap().tags, vec![ERROR]);
    }

    fn processor_without_tag(
        backend: MockExtractionBackend,
        doc: Document,
        missing: i64,
    ) -> (Arc<InMemoryStore>, EntryProcessor) {
        let mut store = InMemoryStore::new().with_document(doc);
        let tags = [
            (INBOX, "Inbox"),
            (PROCESSED, "ai-processed"),
            (ERROR, "ai-error"),
            (CALL, "webhook-call"),
        ];
        for (id, name) in tags {
            if id != missing {
                store = store.with_item(MetadataKind::Tag, id, name);
            }
        }
        let store = Arc::new(store);
        let cache = MetadataCache::new(store.clone(), Duration::from_secs(60));
        let processor = EntryProcessor::new(
            store.clone(),
            Arc::new(backend),
            TagResolver::new(store.clone(), cache),
            ProcessingConfig::default(),
        );
        (store, processor)
    }

    #[tokio::test]
    async fn test_error_tag_applied_when_processing_tag_never_created() {
        let doc = document(42, vec![CALL]);
        let backend = MockExtractionBackend::new().with_default_reply(MockReply::Malformed);
        let (store, processor) = processor_without_tag(backend, doc.clone(), PROCESSED);

        let outcome = processor
            .process(&title_entry(doc, Some("webhook-call")))
            .await;

        assert!(!outcome.succeeded());
        assert!(outcome.call_tag_removed);
        assert!(outcome.outcome_tag_applied);
        assert_eq!(store.document(42).unwrap().tags, vec![ERROR]);
        let patches = store.patches();
        assert_eq!(patches.last().unwrap().1.tags, Some(vec![ERROR]));
    }

    #[tokio::test]
    async fn test_processing_tag_applied_when_error_tag_never_created() {
        let doc = document(42, vec![INBOX]);
        let backend = MockExtractionBackend::new().with_default_response("ACME invoice");
        let (store, processor) = processor_without_tag(backend, doc.clone(), ERROR);

        let outcome = processor.process(&title_entry(doc, None)).await;

        assert!(outcome.succeeded());
        assert!(outcome.outcome_tag_applied);
        assert_eq!(store.document(42).unwrap().tags, vec![INBOX, PROCESSED]);
    }
}
