//! Shared application state.

use std::sync::Arc;

use fable_comments::application::ports::{AuthorLookup, CommentRepository, CommentThreadReader};
use fable_core::clock::Clock;
use fable_core::repository::UnitOfWorkFactory;
use fable_store::pg_author_lookup::PgAuthorLookup;
use fable_store::pg_comment_repository::PgCommentRepository;
use fable_store::pg_story_repository::PgStoryRepositoryFactory;
use fable_store::pg_thread_reader::PgCommentThreadReader;
use fable_stories::domain::aggregates::Story;
use sqlx::PgPool;

/// Application state shared across all request handlers.
///
/// Story handlers open a fresh unit of work per request through `stories`.
#[derive(Clone)]
pub struct AppState {
    /// Clock for deterministic timestamps.
    pub clock: Arc<dyn Clock>,
    /// Opens story repositories.
    pub stories: Arc<dyn UnitOfWorkFactory<Story>>,
    /// Comment writes.
    pub comments: Arc<dyn CommentRepository>,
    /// Comment thread listings.
    pub threads: Arc<dyn CommentThreadReader>,
    /// Author enrichment.
    pub authors: Arc<dyn AuthorLookup>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        stories: Arc<dyn UnitOfWorkFactory<Story>>,
        comments: Arc<dyn CommentRepository>,
        threads: Arc<dyn CommentThreadReader>,
        authors: Arc<dyn AuthorLookup>,
    ) -> Self {
        Self {
            clock,
            stories,
            comments,
            threads,
            authors,
        }
    }

    /// State backed by the Postgres repositories.
    #[must_use]
    pub fn with_postgres(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::clone(&clock),
            Arc::new(PgStoryRepositoryFactory::new(pool.clone(), clock)),
            Arc::new(PgCommentRepository::new(pool.clone())),
            Arc::new(PgCommentThreadReader::new(pool.clone())),
            Arc::new(PgAuthorLookup::new(pool)),
        )
    }
}
