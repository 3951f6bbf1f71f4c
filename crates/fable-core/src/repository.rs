//! Aggregate repository abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;

/// Returned instead of the written aggregate when a compare-and-swap write
/// matched zero rows because another writer got there first.
///
/// This is an expected business outcome, not an error. The caller decides
/// whether to reload and retry or to report the conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSignal<A> {
    /// Human-readable description of the lost race.
    pub message: String,
    /// The caller's in-memory aggregate, exactly as it was handed to the
    /// repository.
    pub stale: A,
}

impl<A: AggregateRoot> ConflictSignal<A> {
    /// Builds the signal for an aggregate whose baseline no longer matches.
    #[must_use]
    pub fn stale_baseline(stale: A) -> Self {
        Self {
            message: format!(
                "aggregate {} was modified or deleted by another writer since it was loaded",
                stale.aggregate_id()
            ),
            stale,
        }
    }
}

/// Result of an `update` or `delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<A> {
    /// The write won; carries the aggregate as storage now holds it (for
    /// deletes, as it was just before removal).
    Written(A),
    /// The write lost an optimistic-concurrency race.
    Conflict(ConflictSignal<A>),
}

impl<A> WriteOutcome<A> {
    /// Returns `true` when the write lost a race.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Repository for one aggregate type, bound to a single unit of work.
///
/// Implementations keep a per-instance [`WatermarkStore`](crate::watermark::WatermarkStore):
/// `load_for_update` records the baseline that `update` and `delete` later
/// compare against. Instances must not outlive the request that created them.
#[async_trait]
pub trait AggregateRepository<A: AggregateRoot>: Send + Sync {
    /// Reads an aggregate without recording a baseline.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<A>, DomainError>;

    /// Reads an aggregate and records its `updated_at` as the baseline for
    /// a later `update`/`delete` in this unit of work.
    async fn load_for_update(&self, id: Uuid) -> Result<Option<A>, DomainError>;

    /// Persists a new aggregate and returns it as reloaded from storage.
    async fn insert(&self, aggregate: A) -> Result<A, DomainError>;

    /// Persists changes to a previously loaded aggregate under the
    /// compare-and-swap protocol.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingBaseline` without touching storage when
    /// the aggregate was not loaded for update in this unit of work.
    async fn update(&self, aggregate: A) -> Result<WriteOutcome<A>, DomainError>;

    /// Removes a previously loaded aggregate under the compare-and-swap
    /// protocol.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingBaseline` without touching storage when
    /// the aggregate was not loaded for update in this unit of work.
    async fn delete(&self, aggregate: A) -> Result<WriteOutcome<A>, DomainError>;
}

/// Opens units of work for one aggregate type.
///
/// Each call hands out a repository with a fresh, empty watermark store, so
/// baselines never leak between requests.
pub trait UnitOfWorkFactory<A: AggregateRoot>: Send + Sync {
    /// Starts a new unit of work.
    fn begin(&self) -> Box<dyn AggregateRepository<A>>;
}
