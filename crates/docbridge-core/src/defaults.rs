//! Centralized default constants for docbridge.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration loaders and clients reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// TAGS
// =============================================================================

/// Tag applied after a document was processed successfully.
pub const PROCESSING_TAG: &str = "ai-processed";

/// Tag applied when processing a document failed.
pub const ERROR_TAG: &str = "ai-error";

/// Tag marking documents awaiting initial triage.
pub const INBOX_TAG: &str = "Inbox";

/// Marker prefix that turns a tag directive into a removal.
pub const TAG_REMOVAL_MARKER: char = '-';

// =============================================================================
// METADATA CACHE
// =============================================================================

/// Metadata cache lifetime in minutes.
pub const CACHE_TTL_MINUTES: u64 = 60;

// =============================================================================
// PAPERLESS
// =============================================================================

/// Timeout for document store requests (seconds).
pub const STORE_TIMEOUT_SECS: u64 = 30;

/// Ordering used for inbox listings (most recently modified first).
pub const INBOX_ORDERING: &str = "-modified";

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Timeout for chat requests (seconds).
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Inference calls slower than this are logged as slow.
pub const SLOW_INFERENCE_THRESHOLD_MS: u64 = 30_000;

/// Prompt used for the startup round-trip.
pub const SELF_CHECK_PROMPT: &str = "Say hello.";

// =============================================================================
// SERVER
// =============================================================================

/// Default listen host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const SERVER_PORT: u16 = 5000;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;
