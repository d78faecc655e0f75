//! Write-path side of the event pipeline.
//!
//! The orchestrator hands events to a bounded channel; a drain task encodes
//! them and pushes them to the queue so queue latency never blocks a write.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::PayloadMode;
use crate::error::{Result, ServiceError};
use crate::events::EventQueue;
use crate::models::{ChangeEvent, Operation, Record};

// == Publisher ==
pub struct EventPublisher<R: Record> {
    tx: mpsc::Sender<ChangeEvent<R>>,
    mode: PayloadMode,
}

impl<R: Record> Clone for EventPublisher<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            mode: self.mode,
        }
    }
}

impl<R: Record> EventPublisher<R> {
    /// Creates a publisher and the receiving end for [`spawn_publisher_task`].
    pub fn channel(capacity: usize, mode: PayloadMode) -> (Self, mpsc::Receiver<ChangeEvent<R>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, mode }, rx)
    }

    /// Queues a change notification without waiting.
    ///
    /// In inline mode CREATE/UPDATE carry the index projection of `record`.
    /// A full or closed channel is reported as `Unavailable`.
    pub fn publish(&self, operation: Operation, id: R::Id, record: Option<&R>) -> Result<()> {
        let payload = match (self.mode, operation) {
            (PayloadMode::Inline, Operation::Create | Operation::Update) => {
                record.map(R::index_view)
            }
            _ => None,
        };
        let event = ChangeEvent::new(operation, id, payload);

        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(event) => ServiceError::Unavailable(format!(
                "event buffer full, dropped {} {}",
                event.operation.as_str(),
                event.entity_id
            )),
            mpsc::error::TrySendError::Closed(_) => {
                ServiceError::Unavailable(format!("{} publisher is closed", R::ENTITY))
            }
        })
    }
}

// == Drain Task ==
/// Spawns the task that forwards queued events to `queue`.
///
/// The task ends once every [`EventPublisher`] clone is dropped and the
/// buffer is drained, so awaiting the handle flushes pending events.
pub fn spawn_publisher_task<R: Record>(
    mut rx: mpsc::Receiver<ChangeEvent<R>>,
    queue: Arc<dyn EventQueue>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(queue = %queue.name(), "Starting event publisher");

        while let Some(event) = rx.recv().await {
            let message = match event.encode() {
                Ok(message) => message,
                Err(err) => {
                    error!(entity = R::ENTITY, id = %event.entity_id, error = %err, "Failed to encode event");
                    continue;
                }
            };

            match queue.publish(message).await {
                Ok(()) => debug!(
                    queue = %queue.name(),
                    operation = event.operation.as_str(),
                    id = %event.entity_id,
                    "Published event"
                ),
                Err(err) => error!(
                    queue = %queue.name(),
                    operation = event.operation.as_str(),
                    id = %event.entity_id,
                    error = %err,
                    "Failed to publish event"
                ),
            }
        }

        info!(queue = %queue.name(), "Event publisher stopped");
    })
}
