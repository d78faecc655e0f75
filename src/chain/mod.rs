//! Cache-chain orchestration.

mod context;
mod orchestrator;
mod stats;

pub use context::RequestContext;
pub use orchestrator::CacheChain;
pub use stats::{ChainStats, ChainStatsSnapshot, TierHits};
