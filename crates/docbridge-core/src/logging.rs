//! Structured logging schema and field name constants for docbridge.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Entry processing failed, startup probe failed |
//! | WARN  | Recoverable issue (patch rejected, call tag not assigned, slow call) |
//! | INFO  | Lifecycle events (startup, shutdown), entry completions |
//! | DEBUG | Cache refreshes, request/response sizes, decision points |
//! | TRACE | Per-page pagination, pull progress lines |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID of an HTTP request (UUIDv7).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "store", "inference", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "paperless", "metadata_cache", "tag_resolver", "ollama", "worker"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "fetch_document", "patch_document", "extract_field", "self_check"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document ID in the document store.
pub const DOCUMENT_ID: &str = "document_id";

/// Queue entry UUID.
pub const ENTRY_ID: &str = "entry_id";

/// Metadata kind (tag, correspondent, document_type, storage_path).
pub const KIND: &str = "kind";

/// Extractable field name.
pub const FIELD: &str = "field";

/// Call tag carried by a queue entry.
pub const CALL_TAG: &str = "call_tag";

/// Client address of an intake request.
pub const CLIENT_IP: &str = "client_ip";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of entries waiting in the processing queue.
pub const QUEUE_LENGTH: &str = "queue_length";

/// Number of items returned by a listing.
pub const RESULT_COUNT: &str = "result_count";

/// Model name used for inference.
pub const MODEL: &str = "model";

/// HTTP status code returned by an upstream service.
pub const STATUS: &str = "status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Whether the operation succeeded.
pub const SUCCESS: &str = "success";

/// Error message text.
pub const ERROR_MSG: &str = "error";

/// Marks an operation as slower than its threshold.
pub const SLOW: &str = "slow";
