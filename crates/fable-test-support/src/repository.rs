//! Test repositories: in-memory `AggregateRepository` implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use fable_core::aggregate::AggregateRoot;
use fable_core::clock::{Clock, to_storage_precision};
use fable_core::error::DomainError;
use fable_core::repository::{AggregateRepository, ConflictSignal, UnitOfWorkFactory, WriteOutcome};
use fable_core::watermark::WatermarkStore;
use uuid::Uuid;

/// An aggregate repository backed by a shared in-memory map that follows the
/// same compare-and-swap protocol as the Postgres store.
///
/// Each instance is one unit of work with its own watermark store. Use
/// [`fork`](Self::fork) (or [`UnitOfWorkFactory::begin`]) to open another unit
/// of work over the same rows, e.g. to simulate two concurrent writers.
pub struct InMemoryAggregateRepository<A> {
    rows: Arc<Mutex<HashMap<Uuid, A>>>,
    storage_calls: Arc<AtomicUsize>,
    watermarks: WatermarkStore,
    clock: Arc<dyn Clock>,
}

impl<A: AggregateRoot> InMemoryAggregateRepository<A> {
    /// Creates an empty repository that stamps writes with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            storage_calls: Arc::new(AtomicUsize::new(0)),
            watermarks: WatermarkStore::new(),
            clock,
        }
    }

    /// Creates a repository pre-populated with `aggregates`, stored as given.
    #[must_use]
    pub fn with_aggregates(clock: Arc<dyn Clock>, aggregates: Vec<A>) -> Self {
        let repo = Self::new(clock);
        {
            let mut rows = repo.rows.lock().unwrap();
            for aggregate in aggregates {
                rows.insert(aggregate.aggregate_id(), aggregate);
            }
        }
        repo
    }

    /// Opens a new unit of work over the same rows with an empty watermark
    /// store.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            storage_calls: Arc::clone(&self.storage_calls),
            watermarks: WatermarkStore::new(),
            clock: Arc::clone(&self.clock),
        }
    }

    /// Returns the stored state of an aggregate, bypassing the watermark.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn stored(&self, id: Uuid) -> Option<A> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    /// Number of storage round trips made by every unit of work sharing
    /// these rows.
    #[must_use]
    pub fn storage_calls(&self) -> usize {
        self.storage_calls.load(Ordering::SeqCst)
    }

    /// The watermark store of this unit of work.
    #[must_use]
    pub fn watermarks(&self) -> &WatermarkStore {
        &self.watermarks
    }

    /// Overwrites a stored row, simulating a write by another process.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn overwrite(&self, aggregate: A) {
        self.rows
            .lock()
            .unwrap()
            .insert(aggregate.aggregate_id(), aggregate);
    }

    fn now(&self) -> DateTime<Utc> {
        to_storage_precision(self.clock.now())
    }

    fn baseline_for(&self, aggregate: &A) -> Result<DateTime<Utc>, DomainError> {
        self.watermarks
            .baseline(aggregate.aggregate_id())
            .ok_or(DomainError::MissingBaseline(aggregate.aggregate_id()))
    }

    fn count_call(&self) {
        self.storage_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl<A> std::fmt::Debug for InMemoryAggregateRepository<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAggregateRepository")
            .field("storage_calls", &self.storage_calls)
            .field("watermarks", &self.watermarks)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<A: AggregateRoot + 'static> AggregateRepository<A> for InMemoryAggregateRepository<A> {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<A>, DomainError> {
        self.count_call();
        Ok(self.stored(id))
    }

    async fn load_for_update(&self, id: Uuid) -> Result<Option<A>, DomainError> {
        self.count_call();
        let found = self.stored(id);
        if let Some(aggregate) = &found {
            self.watermarks.record(id, aggregate.updated_at());
        }
        Ok(found)
    }

    async fn insert(&self, mut aggregate: A) -> Result<A, DomainError> {
        self.count_call();
        let id = aggregate.aggregate_id();
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&id) {
            return Err(DomainError::persistence(
                format!("inserting aggregate {id}"),
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "duplicate key"),
            ));
        }
        let now = self.now();
        aggregate.stamp(now, now);
        rows.insert(id, aggregate.clone());
        Ok(aggregate)
    }

    async fn update(&self, mut aggregate: A) -> Result<WriteOutcome<A>, DomainError> {
        let baseline = self.baseline_for(&aggregate)?;
        self.count_call();
        let id = aggregate.aggregate_id();
        let mut rows = self.rows.lock().unwrap();
        let Some(current) = rows.get(&id).filter(|row| row.updated_at() == baseline) else {
            return Ok(WriteOutcome::Conflict(ConflictSignal::stale_baseline(aggregate)));
        };
        let updated_at = self.now().max(baseline + Duration::microseconds(1));
        aggregate.stamp(current.created_at(), updated_at);
        rows.insert(id, aggregate.clone());
        Ok(WriteOutcome::Written(aggregate))
    }

    async fn delete(&self, aggregate: A) -> Result<WriteOutcome<A>, DomainError> {
        let baseline = self.baseline_for(&aggregate)?;
        self.count_call();
        let id = aggregate.aggregate_id();
        let mut rows = self.rows.lock().unwrap();
        if rows.get(&id).is_none_or(|row| row.updated_at() != baseline) {
            return Ok(WriteOutcome::Conflict(ConflictSignal::stale_baseline(aggregate)));
        }
        rows.remove(&id);
        Ok(WriteOutcome::Written(aggregate))
    }
}

impl<A: AggregateRoot + 'static> UnitOfWorkFactory<A> for InMemoryAggregateRepository<A> {
    fn begin(&self) -> Box<dyn AggregateRepository<A>> {
        Box::new(self.fork())
    }
}

/// An aggregate repository that always returns a persistence error. Useful for
/// testing error-handling paths.
#[derive(Debug, Clone, Copy)]
pub struct FailingAggregateRepository;

fn connection_refused(context: &str) -> DomainError {
    DomainError::persistence(
        context,
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
    )
}

#[async_trait]
impl<A: AggregateRoot + 'static> AggregateRepository<A> for FailingAggregateRepository {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<A>, DomainError> {
        Err(connection_refused("loading aggregate"))
    }

    async fn load_for_update(&self, _id: Uuid) -> Result<Option<A>, DomainError> {
        Err(connection_refused("loading aggregate for update"))
    }

    async fn insert(&self, _aggregate: A) -> Result<A, DomainError> {
        Err(connection_refused("inserting aggregate"))
    }

    async fn update(&self, _aggregate: A) -> Result<WriteOutcome<A>, DomainError> {
        Err(connection_refused("updating aggregate"))
    }

    async fn delete(&self, _aggregate: A) -> Result<WriteOutcome<A>, DomainError> {
        Err(connection_refused("deleting aggregate"))
    }
}

impl<A: AggregateRoot + 'static> UnitOfWorkFactory<A> for FailingAggregateRepository {
    fn begin(&self) -> Box<dyn AggregateRepository<A>> {
        Box::new(*self)
    }
}
