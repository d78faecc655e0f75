//! Construction of the per-entity chain, index and background workers.
//!
//! Clients are built once here, injected into the chains, and shut down by
//! the caller through a cancellation token and the returned join handles.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cache::{ByteStore, LocalCache, MemoryByteStore, RedisStore};
use crate::chain::CacheChain;
use crate::config::Config;
use crate::error::Result;
use crate::events::{
    spawn_publisher_task, EventPublisher, EventQueue, IndexConsumer, MemoryQueue, RedisQueue,
};
use crate::models::{ChangeEvent, Record};
use crate::repository::{
    DistributedRepository, HttpRecordSource, LocalRepository, MemoryRecordStore, PrimarySource,
    RecordSource, Repository,
};
use crate::search::{MemoryIndex, SearchIndex};
use crate::tasks::{spawn_cleanup_task, InstanceLease};

/// Capacity of the in-process stand-in for the distributed cache.
const MEMORY_L2_ENTRIES: usize = 10_000;

// == Backends ==
/// Shared network clients, or their in-process stand-ins when Redis is not configured.
#[derive(Clone)]
pub struct Backends {
    byte_store: Arc<dyn ByteStore>,
    redis_url: Option<String>,
}

impl Backends {
    pub async fn connect(config: &Config) -> Result<Self> {
        let byte_store: Arc<dyn ByteStore> = match &config.redis_url {
            Some(url) => Arc::new(RedisStore::connect(url).await?),
            None => {
                info!("REDIS_URL not set, running distributed cache and queues in-process");
                Arc::new(MemoryByteStore::new(MEMORY_L2_ENTRIES, config.l2_ttl()))
            }
        };
        Ok(Self {
            byte_store,
            redis_url: config.redis_url.clone(),
        })
    }

    /// In-process backends only.
    pub fn in_memory(config: &Config) -> Self {
        Self {
            byte_store: Arc::new(MemoryByteStore::new(MEMORY_L2_ENTRIES, config.l2_ttl())),
            redis_url: None,
        }
    }

    /// Claims the single-instance lease when attached to a shared Redis.
    ///
    /// The system of record and the index are per process, so a second
    /// instance would hand out the same identifiers and consume a share of
    /// the events. It is refused with `Conflict`.
    pub async fn acquire_lease(&self, config: &Config) -> Result<Option<InstanceLease>> {
        if self.redis_url.is_none() {
            return Ok(None);
        }
        let store = Arc::clone(&self.byte_store);
        let lease = InstanceLease::acquire(store, &config.lease_key, config.lease_ttl()).await?;
        Ok(Some(lease))
    }

    async fn queue(&self, name: &str) -> Result<Arc<dyn EventQueue>> {
        Ok(match &self.redis_url {
            Some(url) => Arc::new(RedisQueue::connect(url, name).await?),
            None => Arc::new(MemoryQueue::new(name)),
        })
    }
}

// == Entity ==
/// Request-path handles for one entity type.
pub struct Entity<R: Record> {
    pub chain: Arc<CacheChain<R>>,
    pub index: Arc<dyn SearchIndex<R>>,
    pub local: LocalCache<R>,
}

impl<R: Record> Clone for Entity<R> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            index: Arc::clone(&self.index),
            local: self.local.clone(),
        }
    }
}

/// Background workers for one entity type, not yet started.
pub struct EntityWorkers<R: Record> {
    name: &'static str,
    events: mpsc::Receiver<ChangeEvent<R>>,
    queue: Arc<dyn EventQueue>,
    consumer: IndexConsumer<R>,
    local: LocalCache<R>,
    cleanup_interval: u64,
}

/// Join handles of a started [`EntityWorkers`].
pub struct WorkerHandles {
    /// Ends once every publisher handle is dropped and pending events are sent
    pub publisher: JoinHandle<()>,
    pub consumer: JoinHandle<()>,
    pub cleanup: JoinHandle<()>,
}

impl<R: Record> EntityWorkers<R> {
    pub fn spawn(self, cancel: &CancellationToken) -> WorkerHandles {
        WorkerHandles {
            publisher: spawn_publisher_task(self.events, self.queue),
            consumer: self.consumer.spawn(cancel.child_token()),
            cleanup: spawn_cleanup_task(
                self.name,
                self.local,
                self.cleanup_interval,
                cancel.child_token(),
            ),
        }
    }
}

/// Wires L1, L2, the system of record, the event pipeline and the index for `R`.
pub async fn build_entity<R: Record>(
    config: &Config,
    backends: &Backends,
    queue_name: &str,
) -> Result<(Entity<R>, EntityWorkers<R>)> {
    let local = LocalCache::new(config.l1_max_entries, config.l1_prune_batch, config.l1_ttl());
    let caches: Vec<Arc<dyn Repository<R>>> = vec![
        Arc::new(LocalRepository::new(local.clone(), config.l1_ttl())),
        Arc::new(DistributedRepository::new(
            Arc::clone(&backends.byte_store),
            config.l2_ttl(),
        )),
    ];
    let primary: Arc<dyn Repository<R>> = Arc::new(MemoryRecordStore::<R>::new());

    let (publisher, events) = EventPublisher::channel(config.publish_buffer, config.event_payload);
    let chain = CacheChain::new(caches, Arc::clone(&primary), publisher)
        .with_policies(config.mirror_policy, config.publish_policy);

    let source: Arc<dyn RecordSource<R>> = match &config.record_source_url {
        Some(url) => Arc::new(HttpRecordSource::new(url, config.request_timeout())?),
        None => Arc::new(PrimarySource::new(primary)),
    };
    let queue = backends.queue(queue_name).await?;
    let index: Arc<dyn SearchIndex<R>> = Arc::new(MemoryIndex::<R>::new());
    let consumer = IndexConsumer::new(Arc::clone(&queue), Arc::clone(&index), source);

    info!(
        entity = R::ENTITY,
        queue = %queue_name,
        payload = ?config.event_payload,
        "Entity services ready"
    );

    let entity = Entity {
        chain: Arc::new(chain),
        index,
        local: local.clone(),
    };
    let workers = EntityWorkers {
        name: R::COLLECTION,
        events,
        queue,
        consumer,
        local,
        cleanup_interval: config.cleanup_interval,
    };
    Ok((entity, workers))
}
