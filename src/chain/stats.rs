//! Orchestrator counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters updated on every chain call.
#[derive(Debug)]
pub struct ChainStats {
    tiers: Vec<&'static str>,
    tier_hits: Vec<AtomicU64>,
    misses: AtomicU64,
    backfills: AtomicU64,
    mirror_failures: AtomicU64,
    publish_failures: AtomicU64,
}

/// Point-in-time copy of [`ChainStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChainStatsSnapshot {
    /// Hits per tier, in probe order
    pub tier_hits: Vec<TierHits>,
    /// Reads no tier could answer
    pub misses: u64,
    /// Records written into a higher tier after a lower-tier hit
    pub backfills: u64,
    pub mirror_failures: u64,
    pub publish_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierHits {
    pub tier: &'static str,
    pub hits: u64,
}

impl ChainStats {
    /// One counter per tier name, caches first and the system of record last.
    pub fn new(tiers: Vec<&'static str>) -> Self {
        let tier_hits = tiers.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            tiers,
            tier_hits,
            misses: AtomicU64::new(0),
            backfills: AtomicU64::new(0),
            mirror_failures: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
        }
    }

    pub fn record_hit(&self, tier: usize) {
        if let Some(counter) = self.tier_hits.get(tier) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backfill(&self) {
        self.backfills.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mirror_failure(&self) {
        self.mirror_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ChainStatsSnapshot {
        ChainStatsSnapshot {
            tier_hits: self
                .tiers
                .iter()
                .copied()
                .zip(&self.tier_hits)
                .map(|(tier, hits)| TierHits {
                    tier,
                    hits: hits.load(Ordering::Relaxed),
                })
                .collect(),
            misses: self.misses.load(Ordering::Relaxed),
            backfills: self.backfills.load(Ordering::Relaxed),
            mirror_failures: self.mirror_failures.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}
