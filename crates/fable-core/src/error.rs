//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::pagination::CursorError;

/// Boxed source error preserved inside [`DomainError::Persistence`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level domain error type.
///
/// A lost optimistic-concurrency race is deliberately absent from the storage
/// layer's error surface: repositories report it as
/// [`WriteOutcome::Conflict`](crate::repository::WriteOutcome). Use cases that
/// decide to surface the race to their caller convert it into
/// [`DomainError::ConcurrencyConflict`].
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A row that was just written inside the same transaction could not be
    /// read back. Storage invariants are broken; never retried.
    #[error("aggregate {0} could not be reloaded after a successful write")]
    NotFoundAfterWrite(Uuid),

    /// Optimistic concurrency conflict surfaced by a use case.
    #[error("concurrency conflict on aggregate {aggregate_id}: {message}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// Description of the lost race.
        message: String,
    },

    /// `update`/`delete` was called for an aggregate that was never loaded
    /// for update in the current unit of work.
    #[error("no baseline recorded for aggregate {0}; it must be loaded for update first")]
    MissingBaseline(Uuid),

    /// A validation error in domain logic or caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A malformed or misaddressed pagination cursor.
    #[error("invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    /// An unexpected storage failure.
    #[error("persistence error: {context}")]
    Persistence {
        /// What the repository was doing when the failure happened.
        context: String,
        /// The underlying driver error.
        #[source]
        source: BoxError,
    },
}

impl DomainError {
    /// Wraps a storage failure, keeping the original cause.
    pub fn persistence(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_persistence_error_preserves_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");

        let err = DomainError::persistence("loading story", cause);

        assert_eq!(err.to_string(), "persistence error: loading story");
        let source = err.source().expect("source is kept");
        assert_eq!(source.to_string(), "connection refused");
    }

    #[test]
    fn test_cursor_error_converts_into_invalid_cursor() {
        let err: DomainError = CursorError::MissingField("id").into();

        assert!(matches!(err, DomainError::InvalidCursor(CursorError::MissingField("id"))));
    }
}
