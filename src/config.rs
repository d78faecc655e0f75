//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Failure Policy ==
/// What the orchestrator does when a cache mirror or a publish fails after
/// the system of record already accepted the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and report success
    #[default]
    FailOpen,
    /// Keep the committed write but surface the failure to the caller
    FailClosed,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(FailurePolicy::FailOpen),
            "fail-closed" | "closed" => Ok(FailurePolicy::FailClosed),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

// == Payload Mode ==
/// How the index consumer resolves the record behind a CREATE/UPDATE event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// The publisher embeds the full record in the event
    #[default]
    Inline,
    /// The event carries only the id; the consumer fetches the canonical record
    Refetch,
}

impl FromStr for PayloadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(PayloadMode::Inline),
            "refetch" => Ok(PayloadMode::Refetch),
            other => Err(format!("unknown event payload mode '{}'", other)),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of entries held by each process-local cache
    pub l1_max_entries: usize,
    /// Number of entries evicted at once when a local cache is full
    pub l1_prune_batch: usize,
    /// TTL in seconds for process-local cache entries
    pub l1_ttl: u64,
    /// TTL in seconds for distributed cache entries
    pub l2_ttl: u64,
    /// Background sweep interval in seconds for the local caches
    pub cleanup_interval: u64,
    /// Redis URL; `None` runs L2 and the queues in-process
    pub redis_url: Option<String>,
    /// Queue name for hotel change events
    pub hotels_queue: String,
    /// Queue name for user change events
    pub users_queue: String,
    /// Capacity of the channel between the write path and the publisher task
    pub publish_buffer: usize,
    /// Policy for cache mirror failures after a committed write
    pub mirror_policy: FailurePolicy,
    /// Policy for publish failures after a committed write
    pub publish_policy: FailurePolicy,
    /// Event payload strategy
    pub event_payload: PayloadMode,
    /// Base URL of the record service used for re-fetching (e.g. `http://hotels-api:8081`)
    pub record_source_url: Option<String>,
    /// Per-request deadline in milliseconds
    pub request_timeout_ms: u64,
    /// Upper bound accepted for the `limit` search parameter
    pub search_max_limit: usize,
    /// Redis key that admits a single instance per shared Redis
    pub lease_key: String,
    /// Lease TTL in seconds, renewed every third of it
    pub lease_ttl: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` (default: 8080)
    /// - `L1_MAX_ENTRIES` (default: 1000), `L1_PRUNE_BATCH` (default: 100)
    /// - `L1_TTL_SECS` (default: 60), `L2_TTL_SECS` (default: 300)
    /// - `CLEANUP_INTERVAL` (default: 1)
    /// - `REDIS_URL` (optional)
    /// - `HOTELS_QUEUE` (default: hotels-news), `USERS_QUEUE` (default: users-news)
    /// - `PUBLISH_BUFFER` (default: 1024)
    /// - `MIRROR_POLICY`, `PUBLISH_POLICY` (`fail-open` | `fail-closed`, default: fail-open)
    /// - `EVENT_PAYLOAD` (`inline` | `refetch`, default: inline)
    /// - `RECORD_SOURCE_URL` (optional)
    /// - `REQUEST_TIMEOUT_MS` (default: 5000)
    /// - `SEARCH_MAX_LIMIT` (default: 100)
    /// - `INSTANCE_LEASE_KEY` (default: cache_chain:instance), `INSTANCE_LEASE_TTL_SECS` (default: 15)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parsed("SERVER_PORT").unwrap_or(defaults.server_port),
            l1_max_entries: parsed("L1_MAX_ENTRIES").unwrap_or(defaults.l1_max_entries),
            l1_prune_batch: parsed("L1_PRUNE_BATCH").unwrap_or(defaults.l1_prune_batch),
            l1_ttl: parsed("L1_TTL_SECS").unwrap_or(defaults.l1_ttl),
            l2_ttl: parsed("L2_TTL_SECS").unwrap_or(defaults.l2_ttl),
            cleanup_interval: parsed("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            redis_url: non_empty("REDIS_URL"),
            hotels_queue: non_empty("HOTELS_QUEUE").unwrap_or(defaults.hotels_queue),
            users_queue: non_empty("USERS_QUEUE").unwrap_or(defaults.users_queue),
            publish_buffer: parsed("PUBLISH_BUFFER").unwrap_or(defaults.publish_buffer),
            mirror_policy: parsed("MIRROR_POLICY").unwrap_or(defaults.mirror_policy),
            publish_policy: parsed("PUBLISH_POLICY").unwrap_or(defaults.publish_policy),
            event_payload: parsed("EVENT_PAYLOAD").unwrap_or(defaults.event_payload),
            record_source_url: non_empty("RECORD_SOURCE_URL"),
            request_timeout_ms: parsed("REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),
            search_max_limit: parsed("SEARCH_MAX_LIMIT").unwrap_or(defaults.search_max_limit),
            lease_key: non_empty("INSTANCE_LEASE_KEY").unwrap_or(defaults.lease_key),
            lease_ttl: parsed("INSTANCE_LEASE_TTL_SECS").unwrap_or(defaults.lease_ttl),
        }
    }

    /// TTL for process-local entries.
    pub fn l1_ttl(&self) -> Duration {
        Duration::from_secs(self.l1_ttl)
    }

    /// TTL for distributed entries.
    pub fn l2_ttl(&self) -> Duration {
        Duration::from_secs(self.l2_ttl)
    }

    /// Per-request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Lifetime of the instance lease.
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            l1_max_entries: 1000,
            l1_prune_batch: 100,
            l1_ttl: 60,
            l2_ttl: 300,
            cleanup_interval: 1,
            redis_url: None,
            hotels_queue: "hotels-news".to_string(),
            users_queue: "users-news".to_string(),
            publish_buffer: 1024,
            mirror_policy: FailurePolicy::FailOpen,
            publish_policy: FailurePolicy::FailOpen,
            event_payload: PayloadMode::Inline,
            record_source_url: None,
            request_timeout_ms: 5000,
            search_max_limit: 100,
            lease_key: "cache_chain:instance".to_string(),
            lease_ttl: 15,
        }
    }
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
