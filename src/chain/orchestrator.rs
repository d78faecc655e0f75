//! Cache-aside orchestrator over an ordered list of cache tiers and a system of record.
//!
//! Reads probe the caches in order, then the system of record, and backfill
//! every cache above the tier that answered. Writes go to the system of
//! record first; caches are mirrored afterwards and one change event is
//! published per committed write.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::chain::{ChainStats, ChainStatsSnapshot, RequestContext};
use crate::config::FailurePolicy;
use crate::error::{Result, ServiceError};
use crate::events::EventPublisher;
use crate::models::{Operation, Record};
use crate::repository::Repository;

// == Lookups ==
enum Lookup<'a, R: Record> {
    Id(&'a R::Id),
    Alias(&'a str),
}

impl<R: Record> Lookup<'_, R> {
    async fn probe(&self, repo: &dyn Repository<R>) -> Result<R> {
        match self {
            Lookup::Id(id) => repo.get_by_id(id).await,
            Lookup::Alias(alias) => repo.get_by_alias(alias).await,
        }
    }
}

impl<R: Record> fmt::Display for Lookup<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "{} {}", R::ENTITY, id),
            Lookup::Alias(alias) => write!(
                f,
                "{} with {} '{}'",
                R::ENTITY,
                R::ALIAS_FIELD.unwrap_or("alias"),
                alias
            ),
        }
    }
}

// == Cache Writes ==
enum CacheWrite<'a, R: Record> {
    Create(&'a R),
    /// Merged record, plus the alias it was cached under before a rename
    Update(&'a R, Option<&'a str>),
    /// Record as the system of record held it when removed
    Delete(&'a R),
}

impl<R: Record> CacheWrite<'_, R> {
    async fn apply(&self, repo: &dyn Repository<R>) -> Result<()> {
        match self {
            CacheWrite::Create(record) => repo.create((*record).clone()).await.map(|_| ()),
            CacheWrite::Update(record, stale_alias) => {
                if let Some(alias) = stale_alias {
                    absent_ok(repo.delete_alias(alias).await)?;
                }
                repo.update((*record).clone()).await.map(|_| ())
            }
            // Id and alias entries are evicted independently, so both are cleared
            CacheWrite::Delete(record) => {
                absent_ok(repo.delete(&record.require_id()?).await.map(|_| ()))?;
                match record.alias() {
                    Some(alias) => absent_ok(repo.delete_alias(alias).await),
                    None => Ok(()),
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            CacheWrite::Create(_) => "create",
            CacheWrite::Update(..) => "update",
            CacheWrite::Delete(_) => "delete",
        }
    }
}

/// Nothing cached is as good as a removed entry.
fn absent_ok(result: Result<()>) -> Result<()> {
    match result {
        Err(err) if err.is_miss() => Ok(()),
        other => other,
    }
}

// == Cache Chain ==
pub struct CacheChain<R: Record> {
    /// Cache tiers, fastest first
    caches: Vec<Arc<dyn Repository<R>>>,
    /// System of record
    primary: Arc<dyn Repository<R>>,
    publisher: EventPublisher<R>,
    mirror_policy: FailurePolicy,
    publish_policy: FailurePolicy,
    stats: ChainStats,
}

impl<R: Record> CacheChain<R> {
    /// Creates a fail-open chain.
    pub fn new(
        caches: Vec<Arc<dyn Repository<R>>>,
        primary: Arc<dyn Repository<R>>,
        publisher: EventPublisher<R>,
    ) -> Self {
        let tiers = caches
            .iter()
            .map(|repo| repo.tier())
            .chain(std::iter::once(primary.tier()))
            .collect();
        Self {
            caches,
            primary,
            publisher,
            mirror_policy: FailurePolicy::FailOpen,
            publish_policy: FailurePolicy::FailOpen,
            stats: ChainStats::new(tiers),
        }
    }

    pub fn with_policies(mut self, mirror: FailurePolicy, publish: FailurePolicy) -> Self {
        self.mirror_policy = mirror;
        self.publish_policy = publish;
        self
    }

    pub fn stats(&self) -> ChainStatsSnapshot {
        self.stats.snapshot()
    }

    // == Reads ==
    pub async fn get_by_id(&self, ctx: &RequestContext, id: &R::Id) -> Result<R> {
        self.read(ctx, Lookup::Id(id)).await
    }

    /// Looks a record up by its unique secondary attribute (user `username`).
    pub async fn get_by_alias(&self, ctx: &RequestContext, alias: &str) -> Result<R> {
        self.read(ctx, Lookup::Alias(alias)).await
    }

    async fn read(&self, ctx: &RequestContext, lookup: Lookup<'_, R>) -> Result<R> {
        let tiers = self.caches.iter().chain(std::iter::once(&self.primary));

        for (level, repo) in tiers.enumerate() {
            match ctx.guard(lookup.probe(repo.as_ref())).await {
                Ok(record) => {
                    self.stats.record_hit(level);
                    debug!(tier = repo.tier(), lookup = %lookup, "Chain hit");
                    self.backfill(ctx, level, &record).await;
                    return Ok(record);
                }
                Err(err @ ServiceError::Cancelled(_)) => return Err(err),
                Err(err) if err.is_miss() => {
                    debug!(tier = repo.tier(), lookup = %lookup, "Chain miss");
                }
                Err(err) => {
                    warn!(
                        tier = repo.tier(),
                        lookup = %lookup,
                        kind = err.kind(),
                        error = %err,
                        "Tier read failed, trying next tier"
                    );
                }
            }
        }

        self.stats.record_miss();
        Err(ServiceError::NotFound(lookup.to_string()))
    }

    /// Writes `record` into every cache above `level`. Failures are only logged.
    async fn backfill(&self, ctx: &RequestContext, level: usize, record: &R) {
        let above = level.min(self.caches.len());
        for repo in &self.caches[..above] {
            if ctx.is_done() {
                debug!(tier = repo.tier(), "Request done, skipping backfill");
                return;
            }
            match ctx.guard(repo.create(record.clone())).await {
                Ok(_) => self.stats.record_backfill(),
                Err(err) => warn!(
                    tier = repo.tier(),
                    kind = err.kind(),
                    error = %err,
                    "Backfill failed"
                ),
            }
        }
    }

    // == Writes ==
    // A request already done never reaches the system of record. Once the
    // write has started it runs to completion.

    /// Creates a record in the system of record and returns its new identifier.
    pub async fn create(&self, ctx: &RequestContext, record: R) -> Result<R::Id> {
        ctx.check()?;
        let id = self.primary.create(record.clone()).await?;
        let mut stored = record;
        stored.set_id(id.clone());

        let mirrored = self.mirror(ctx, CacheWrite::Create(&stored)).await;
        let published = self.publish(Operation::Create, id.clone(), Some(&stored));
        self.settle(mirrored, published)?;
        Ok(id)
    }

    /// Applies a partial update and returns the merged record.
    pub async fn update(&self, ctx: &RequestContext, patch: R) -> Result<R> {
        ctx.check()?;
        // Only a patch carrying the alias can rename
        let previous = match patch.alias() {
            Some(_) => self.primary.get_by_id(&patch.require_id()?).await.ok(),
            None => None,
        };
        let merged = self.primary.update(patch).await?;
        let id = merged.require_id()?;
        let stale_alias = previous
            .as_ref()
            .and_then(R::alias)
            .filter(|old| Some(*old) != merged.alias());

        let mirrored = self.mirror(ctx, CacheWrite::Update(&merged, stale_alias)).await;
        let published = self.publish(Operation::Update, id, Some(&merged));
        self.settle(mirrored, published)?;
        Ok(merged)
    }

    pub async fn delete(&self, ctx: &RequestContext, id: &R::Id) -> Result<()> {
        ctx.check()?;
        let removed = self.primary.delete(id).await?;

        let mirrored = self.mirror(ctx, CacheWrite::Delete(&removed)).await;
        let published = self.publish(Operation::Delete, id.clone(), None);
        self.settle(mirrored, published)
    }

    /// Applies a committed write to every cache. Returns the first failure.
    async fn mirror(&self, ctx: &RequestContext, write: CacheWrite<'_, R>) -> Result<()> {
        let mut first_error = None;

        for repo in &self.caches {
            if ctx.is_done() {
                debug!(tier = repo.tier(), op = write.name(), "Request done, skipping cache mirror");
                break;
            }
            match ctx.guard(write.apply(repo.as_ref())).await {
                Ok(()) => {}
                Err(ServiceError::Cancelled(_)) => break,
                Err(err) => {
                    self.stats.record_mirror_failure();
                    warn!(
                        entity = R::ENTITY,
                        tier = repo.tier(),
                        op = write.name(),
                        kind = err.kind(),
                        error = %err,
                        "Cache mirror failed"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn publish(&self, operation: Operation, id: R::Id, record: Option<&R>) -> Result<()> {
        self.publisher
            .publish(operation, id.clone(), record)
            .inspect_err(|err| {
                self.stats.record_publish_failure();
                warn!(
                    entity = R::ENTITY,
                    id = %id,
                    operation = operation.as_str(),
                    error = %err,
                    "Change event not published"
                );
            })
    }

    fn settle(&self, mirrored: Result<()>, published: Result<()>) -> Result<()> {
        if let Err(err) = mirrored {
            if self.mirror_policy == FailurePolicy::FailClosed {
                return Err(err);
            }
        }
        if let Err(err) = published {
            if self.publish_policy == FailurePolicy::FailClosed {
                return Err(err);
            }
        }
        Ok(())
    }
}
