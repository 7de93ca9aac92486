//! Background worker draining the processing queue.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use docbridge_core::{defaults, Error, QueueEntry, Result};

use crate::processor::{EntryProcessor, ProcessingOutcome};
use crate::queue::QueueReceiver;

/// Event emitted by the queue worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Worker started.
    WorkerStarted,
    /// An entry was taken off the queue.
    EntryStarted { entry_id: Uuid, document_id: i64 },
    /// The entry's fields were updated and the processing tag applied.
    EntryCompleted { entry_id: Uuid, document_id: i64 },
    /// Extraction or the field update failed, or processing panicked.
    EntryFailed {
        entry_id: Uuid,
        document_id: i64,
        error: String,
    },
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_tx: broadcast::Sender<WorkerEvent>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to stop and wait for it to exit.
    ///
    /// An entry already being processed is completed first. Entries still
    /// waiting in the queue are dropped.
    pub async fn shutdown(self) -> Result<()> {
        // The worker may already have exited because every producer is gone
        let _ = self.shutdown_tx.send(()).await;
        self.join
            .await
            .map_err(|e| Error::Internal(format!("Queue worker task failed: {}", e)))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// True once the worker loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// The single consumer of the processing queue.
///
/// Entries are processed strictly one at a time in arrival order.
pub struct QueueWorker {
    receiver: QueueReceiver,
    processor: Arc<EntryProcessor>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl QueueWorker {
    pub fn new(receiver: QueueReceiver, processor: EntryProcessor) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            receiver,
            processor: Arc::new(processor),
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    ///
    /// Subscribe before [`start`](Self::start) to observe `WorkerStarted`.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Spawn the worker loop on the current runtime.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_tx = self.event_tx.clone();
        let join = tokio::spawn(self.run(shutdown_rx));

        WorkerHandle {
            shutdown_tx,
            event_tx,
            join,
        }
    }

    #[instrument(skip_all, fields(subsystem = "jobs", component = "worker"))]
    async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!("Queue worker started");
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        loop {
            let entry = tokio::select! {
                biased;
                Some(()) = shutdown_rx.recv() => {
                    info!("Queue worker received shutdown signal");
                    break;
                }
                entry = self.receiver.recv() => match entry {
                    Some(entry) => entry,
                    None => {
                        info!("Processing queue closed");
                        break;
                    }
                },
            };

            self.handle_entry(entry).await;
        }

        let dropped = self.receiver.len();
        if dropped > 0 {
            warn!(queue_length = dropped, "Dropping unprocessed queue entries");
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Queue worker stopped");
    }

    async fn handle_entry(&self, entry: QueueEntry) {
        let start = Instant::now();
        let entry_id = entry.id;
        let document_id = entry.document.id;

        info!(
            %entry_id,
            document_id,
            client_ip = %entry.client_ip,
            call_tag = entry.tag.as_deref().unwrap_or(""),
            queue_length = self.receiver.len(),
            "Processing entry"
        );
        let _ = self.event_tx.send(WorkerEvent::EntryStarted {
            entry_id,
            document_id,
        });

        let entry = Arc::new(entry);
        let outcome = match self.spawn_process(entry.clone()).await {
            Ok(outcome) => outcome,
            Err(message) => {
                error!(%entry_id, document_id, error = %message, "Entry processing panicked");
                self.spawn_recover(entry, message).await
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome.failure_reason() {
            None => {
                info!(%entry_id, document_id, duration_ms, "Entry completed");
                let _ = self.event_tx.send(WorkerEvent::EntryCompleted {
                    entry_id,
                    document_id,
                });
            }
            Some(error) => {
                warn!(%entry_id, document_id, duration_ms, error = %error, "Entry failed");
                let _ = self.event_tx.send(WorkerEvent::EntryFailed {
                    entry_id,
                    document_id,
                    error,
                });
            }
        }
    }

    /// Run the processor in its own task so a panic cannot take down the loop.
    async fn spawn_process(&self, entry: Arc<QueueEntry>) -> std::result::Result<ProcessingOutcome, String> {
        let processor = self.processor.clone();
        tokio::spawn(async move { processor.process(&entry).await })
            .await
            .map_err(|e| {
                if e.is_panic() {
                    format!("Processing panicked: {}", panic_message(e.into_panic()))
                } else {
                    format!("Processing task cancelled: {}", e)
                }
            })
    }

    async fn spawn_recover(&self, entry: Arc<QueueEntry>, message: String) -> ProcessingOutcome {
        let processor = self.processor.clone();
        let fallback = ProcessingOutcome {
            error: Some(message.clone()),
            ..Default::default()
        };
        match tokio::spawn(async move { processor.recover(&entry, message).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = ?e, "Tag recovery after panic failed");
                fallback
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        debug!("Panic payload is not a string");
        "unknown panic".to_string()
    }
}
