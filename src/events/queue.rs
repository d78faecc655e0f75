//! Named queues carrying encoded change events.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use crate::error::{Result, ServiceError};

/// Seconds a blocking pop waits before returning control to the consumer.
const RECEIVE_TIMEOUT_SECS: f64 = 1.0;

// == Event Queue ==
/// A single named queue. Messages are acknowledged on delivery.
#[async_trait]
pub trait EventQueue: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, message: Vec<u8>) -> Result<()>;

    /// Waits briefly for the next message; `None` when nothing arrived.
    async fn receive(&self) -> Result<Option<Vec<u8>>>;
}

// == In-Process ==
/// Unbounded in-process queue for single-instance deployments and tests.
pub struct MemoryQueue {
    name: String,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            tx,
            rx: Mutex::new(rx),
        }
    }
}

#[async_trait]
impl EventQueue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, message: Vec<u8>) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| ServiceError::Unavailable(format!("queue {} is closed", self.name)))
    }

    async fn receive(&self) -> Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        let wait = std::time::Duration::from_secs_f64(RECEIVE_TIMEOUT_SECS);
        match tokio::time::timeout(wait, rx.recv()).await {
            Ok(message) => Ok(message),
            Err(_) => Ok(None),
        }
    }
}

// == Redis ==
/// Redis list used as a queue: `RPUSH` to publish, `BLPOP` to receive.
///
/// Receiving blocks its connection, so publish and receive use separate ones.
pub struct RedisQueue {
    name: String,
    publisher: ConnectionManager,
    consumer: ConnectionManager,
}

impl RedisQueue {
    pub async fn connect(url: &str, name: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let publisher = client.get_connection_manager().await?;
        let consumer = client.get_connection_manager().await?;
        let name = name.into();
        info!(queue = %name, "Connected event queue");
        Ok(Self {
            name,
            publisher,
            consumer,
        })
    }
}

#[async_trait]
impl EventQueue for RedisQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, message: Vec<u8>) -> Result<()> {
        let mut conn = self.publisher.clone();
        conn.rpush::<_, _, ()>(&self.name, message).await?;
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Vec<u8>>> {
        let mut conn = self.consumer.clone();
        let popped: Option<(String, Vec<u8>)> =
            conn.blpop(&self.name, RECEIVE_TIMEOUT_SECS).await?;
        Ok(popped.map(|(_, message)| message))
    }
}
