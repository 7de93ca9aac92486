//! # docbridge-jobs
//!
//! In-memory processing queue and single background worker for docbridge.
//!
//! This crate provides:
//! - [`ProcessingQueue`]: unbounded FIFO with non-blocking enqueue and a
//!   pending-entry counter
//! - [`EntryProcessor`]: extraction, field update and tag bookkeeping for
//!   one queue entry
//! - [`QueueWorker`]: the sole consumer, processing one entry at a time
//! - Lifecycle notifications via broadcast channels
//!
//! Entries live only in memory; anything still queued at shutdown is lost.
//!
//! ## Example
//!
//! ```ignore
//! use docbridge_jobs::{EntryProcessor, ProcessingConfig, ProcessingQueue, QueueWorker};
//!
//! let (queue, receiver) = ProcessingQueue::channel();
//! let processor = EntryProcessor::new(store, backend, resolver, ProcessingConfig::default());
//!
//! // Start worker and get handle
//! let handle = QueueWorker::new(receiver, processor).start();
//!
//! queue.enqueue(entry)?;
//!
//! // Listen for events
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! // Graceful shutdown: the entry in flight completes first
//! handle.shutdown().await?;
//! ```

pub mod processor;
pub mod queue;
pub mod worker;

pub use processor::{EntryProcessor, ProcessingConfig, ProcessingOutcome};
pub use queue::{ProcessingQueue, QueueReceiver};
pub use worker::{QueueWorker, WorkerEvent, WorkerHandle};
