//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired entries from the process-local caches
//! - Instance Lease: Keeps a single instance attached to a shared Redis

mod cleanup;
mod lease;

pub use cleanup::spawn_cleanup_task;
pub use lease::{spawn_lease_task, InstanceLease};
