//! Aggregate root abstraction.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Trait for aggregate roots persisted as current-state rows.
///
/// The `updated_at` timestamp doubles as the optimistic-concurrency token:
/// storage assigns it on every successful write and the repository compares
/// against the value observed at load time.
pub trait AggregateRoot: Clone + Send + Sync + std::fmt::Debug {
    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the creation timestamp assigned by storage.
    fn created_at(&self) -> DateTime<Utc>;

    /// Returns the last-modified timestamp assigned by storage.
    fn updated_at(&self) -> DateTime<Utc>;

    /// Overwrites the audit timestamps with the values storage assigned.
    fn stamp(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);
}
