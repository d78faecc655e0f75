//! Instance Lease
//!
//! The system of record and the search index live in process memory, so only
//! one instance may attach to a shared distributed cache and queue. The lease
//! is a key claimed with set-if-absent, renewed while the instance runs and
//! released on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cache::ByteStore;
use crate::error::{Result, ServiceError};

// == Instance Lease ==
pub struct InstanceLease {
    store: Arc<dyn ByteStore>,
    key: String,
    owner: Vec<u8>,
    ttl: Duration,
}

impl InstanceLease {
    /// Claims `key` for this process, or fails with `Conflict` when another
    /// instance holds it.
    pub async fn acquire(store: Arc<dyn ByteStore>, key: &str, ttl: Duration) -> Result<Self> {
        let owner = instance_id().into_bytes();
        if !store.claim(key, owner.clone(), ttl).await? {
            return Err(ServiceError::Conflict(format!(
                "instance lease '{}' is held by another process",
                key
            )));
        }
        info!(lease = %key, ttl_secs = ttl.as_secs(), "Instance lease acquired");
        Ok(Self {
            store,
            key: key.to_string(),
            owner,
            ttl,
        })
    }

    async fn held(&self) -> Result<bool> {
        Ok(self.store.get(&self.key).await?.as_deref() == Some(self.owner.as_slice()))
    }

    /// Extends the lease. Returns false once another owner holds the key or it expired.
    pub async fn renew(&self) -> Result<bool> {
        if !self.held().await? {
            return Ok(false);
        }
        self.store.set(&self.key, self.owner.clone(), self.ttl).await?;
        Ok(true)
    }

    pub async fn release(&self) -> Result<()> {
        if self.held().await? {
            self.store.delete(&self.key).await?;
            info!(lease = %self.key, "Instance lease released");
        }
        Ok(())
    }

    fn renew_interval(&self) -> Duration {
        (self.ttl / 3).max(Duration::from_millis(10))
    }
}

fn instance_id() -> String {
    let now = chrono::Utc::now();
    format!(
        "{}-{}",
        std::process::id(),
        now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros())
    )
}

/// Spawns the renewal loop for `lease`.
///
/// Cancelling `shutdown` releases the lease and ends the task. Losing the
/// lease cancels `shutdown`, so the server stops instead of running next to
/// another owner.
pub fn spawn_lease_task(lease: InstanceLease, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = lease.renew_interval();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            match lease.renew().await {
                Ok(true) => {}
                Ok(false) => {
                    error!(lease = %lease.key, "Instance lease lost, shutting down");
                    shutdown.cancel();
                    return;
                }
                Err(err) => warn!(lease = %lease.key, error = %err, "Lease renewal failed"),
            }
        }

        if let Err(err) = lease.release().await {
            warn!(lease = %lease.key, error = %err, "Lease release failed");
        }
    })
}
