//! Cache Module
//!
//! Process-local (L1) and distributed (L2) cache building blocks.

mod distributed;
mod entry;
mod keys;
mod local;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use distributed::{ByteStore, MemoryByteStore, RedisStore};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use keys::{alias_key, id_key};
pub use local::LocalCache;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
