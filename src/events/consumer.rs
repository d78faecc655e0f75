//! Read side of the event pipeline: drains a queue into a search index.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::events::EventQueue;
use crate::models::{ChangeEvent, Decoded, Operation, Record};
use crate::repository::RecordSource;
use crate::search::SearchIndex;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

pub struct IndexConsumer<R: Record> {
    queue: Arc<dyn EventQueue>,
    index: Arc<dyn SearchIndex<R>>,
    source: Arc<dyn RecordSource<R>>,
}

impl<R: Record> IndexConsumer<R> {
    pub fn new(
        queue: Arc<dyn EventQueue>,
        index: Arc<dyn SearchIndex<R>>,
        source: Arc<dyn RecordSource<R>>,
    ) -> Self {
        Self {
            queue,
            index,
            source,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Consumes until `cancel` fires. Queue failures back off and retry.
    pub async fn run(self, cancel: CancellationToken) {
        info!(queue = %self.queue.name(), entity = R::ENTITY, "Starting index consumer");
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.queue.receive() => received,
            };

            match received {
                Ok(Some(message)) => {
                    backoff = INITIAL_BACKOFF;
                    if let Err(err) = self.handle_message(&message).await {
                        warn!(
                            queue = %self.queue.name(),
                            error = %err,
                            "Discarding event"
                        );
                    }
                }
                Ok(None) => backoff = INITIAL_BACKOFF,
                Err(err) => {
                    error!(queue = %self.queue.name(), error = %err, retry_in = ?backoff, "Queue receive failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }

        info!(queue = %self.queue.name(), "Index consumer stopped");
    }

    /// Decodes and applies one message. Unknown operations are skipped.
    pub async fn handle_message(&self, message: &[u8]) -> Result<()> {
        match ChangeEvent::<R>::decode(message)? {
            Decoded::Event(event) => self.apply(event).await,
            Decoded::Unknown {
                operation,
                entity_id,
            } => {
                warn!(
                    entity = R::ENTITY,
                    operation = %operation,
                    id = %entity_id,
                    "Unknown event operation"
                );
                Ok(())
            }
        }
    }

    pub async fn apply(&self, event: ChangeEvent<R>) -> Result<()> {
        let id = event.entity_id;
        match event.operation {
            Operation::Create | Operation::Update => {
                let record = match event.payload {
                    Some(record) => record,
                    None => self.source.fetch(&id).await?,
                };
                if event.operation == Operation::Create {
                    self.index.index(record).await?;
                } else {
                    self.index.update(record).await?;
                }
            }
            Operation::Delete => self.index.delete(&id).await?,
        }
        debug!(
            entity = R::ENTITY,
            operation = event.operation.as_str(),
            id = %id,
            "Applied event to index"
        );
        Ok(())
    }
}
