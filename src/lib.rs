//! Cache Chain - tiered cache-aside data access with event-driven search indexing
//!
//! Reads fall through a process-local cache, a distributed cache and a system
//! of record, backfilling the faster tiers. Writes land in the system of
//! record first and emit change events that keep a search index up to date.

pub mod api;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod repository;
pub mod search;
pub mod services;
pub mod tasks;

pub use api::AppState;
pub use chain::{CacheChain, RequestContext};
pub use config::Config;
pub use error::{Result, ServiceError};
pub use services::{build_entity, Backends, Entity, EntityWorkers, WorkerHandles};
pub use tasks::{spawn_cleanup_task, spawn_lease_task, InstanceLease};
