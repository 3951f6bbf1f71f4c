//! Storage ports for the Comments context.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fable_core::error::DomainError;
use fable_core::pagination::{Page, PageRequest};
use uuid::Uuid;

use crate::domain::aggregates::Comment;
use crate::domain::read_models::{AuthorSummary, CommentRow, ReplyRow};

/// Write-side access to comments.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Returns `true` if the story exists.
    async fn post_exists(&self, post_id: Uuid) -> Result<bool, DomainError>;

    /// Loads a comment, deleted or not.
    async fn find_by_id(&self, comment_id: Uuid) -> Result<Option<Comment>, DomainError>;

    /// Persists a new comment.
    async fn insert(&self, comment: &Comment) -> Result<(), DomainError>;

    /// Marks a comment deleted. Returns `false` if no such comment exists.
    async fn soft_delete(&self, comment_id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError>;
}

/// Keyset-paginated thread listings.
#[async_trait]
pub trait CommentThreadReader: Send + Sync {
    /// Top-level comments of a story, each with up to `preview_limit` replies.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCursor` when the request's cursor is
    /// malformed or was issued for a reply listing.
    async fn list_top_level(
        &self,
        post_id: Uuid,
        request: &PageRequest,
        preview_limit: u32,
    ) -> Result<Page<CommentRow>, DomainError>;

    /// Direct replies of one top-level comment.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCursor` when the request's cursor is
    /// malformed or was issued for another parent.
    async fn list_replies(
        &self,
        parent_comment_id: Uuid,
        request: &PageRequest,
    ) -> Result<Page<ReplyRow>, DomainError>;

    /// All comments of a story, replies and deleted comments included.
    async fn count_for_post(&self, post_id: Uuid) -> Result<i64, DomainError>;

    /// Direct replies of one comment.
    async fn count_replies(&self, parent_comment_id: Uuid) -> Result<i64, DomainError>;
}

/// Cross-context lookup of author identities.
#[async_trait]
pub trait AuthorLookup: Send + Sync {
    /// Resolves the given user ids; unknown ids are absent from the map.
    async fn find_authors(
        &self,
        author_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, AuthorSummary>, DomainError>;
}
