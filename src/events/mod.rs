//! Change-event pipeline between the write path and the search index.

mod consumer;
mod publisher;
mod queue;

pub use consumer::IndexConsumer;
pub use publisher::{spawn_publisher_task, EventPublisher};
pub use queue::{EventQueue, MemoryQueue, RedisQueue};
