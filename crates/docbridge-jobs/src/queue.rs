//! Unbounded in-memory processing queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use docbridge_core::{Error, QueueEntry, Result};

/// Producer side of the processing queue. Cheap to clone.
#[derive(Clone)]
pub struct ProcessingQueue {
    tx: mpsc::UnboundedSender<QueueEntry>,
    pending: Arc<AtomicUsize>,
}

/// Consumer side of the processing queue, owned by the worker.
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<QueueEntry>,
    pending: Arc<AtomicUsize>,
}

impl ProcessingQueue {
    /// Create a queue and its single receiver.
    pub fn channel() -> (ProcessingQueue, QueueReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            ProcessingQueue {
                tx,
                pending: pending.clone(),
            },
            QueueReceiver { rx, pending },
        )
    }

    /// Append an entry without blocking. Returns the queue length including
    /// the new entry.
    pub fn enqueue(&self, entry: QueueEntry) -> Result<usize> {
        let entry_id = entry.id;
        let document_id = entry.document.id;

        // Count first so the consumer can never decrement below zero
        let length = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(entry).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Internal(
                "Processing worker is not running".to_string(),
            ));
        }

        debug!(
            %entry_id,
            document_id,
            queue_length = length,
            "Entry enqueued"
        );
        Ok(length)
    }

    /// Entries waiting to be picked up by the worker.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl QueueReceiver {
    /// Wait for the next entry. Returns `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<QueueEntry> {
        let entry = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(entry)
    }

    /// Entries still waiting.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
