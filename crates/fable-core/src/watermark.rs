//! Optimistic-lock baselines for one unit of work.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-unit-of-work map from aggregate id to the `updated_at` value observed
/// when the aggregate was loaded for update.
///
/// A store is created empty at the start of a unit of work and dropped (or
/// cleared) at its end. It must never be shared between requests: a baseline
/// leaking across units of work would let a stale writer pass the CAS check.
#[derive(Debug, Default)]
pub struct WatermarkStore {
    baselines: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl WatermarkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the baseline observed for `aggregate_id`, replacing any
    /// previous value.
    pub fn record(&self, aggregate_id: Uuid, observed_updated_at: DateTime<Utc>) {
        self.lock().insert(aggregate_id, observed_updated_at);
    }

    /// Returns the baseline recorded for `aggregate_id`, if any.
    #[must_use]
    pub fn baseline(&self, aggregate_id: Uuid) -> Option<DateTime<Utc>> {
        self.lock().get(&aggregate_id).copied()
    }

    /// Forgets every recorded baseline.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of aggregates with a recorded baseline.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when no baseline is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, DateTime<Utc>>> {
        // The map holds plain values, so a poisoned guard is still consistent.
        self.baselines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
