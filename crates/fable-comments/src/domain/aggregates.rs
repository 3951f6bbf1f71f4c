//! Comment entity.

use chrono::{DateTime, Utc};
use fable_core::error::DomainError;
use uuid::Uuid;

/// Longest comment body accepted, in characters.
pub const MAX_BODY_CHARS: usize = 10_000;

/// A comment on a story, or a reply to a top-level comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment identifier.
    pub id: Uuid,
    /// The story (post) the comment belongs to.
    pub post_id: Uuid,
    /// The user who wrote the comment.
    pub author_id: Uuid,
    /// `None` for top-level comments.
    pub parent_comment_id: Option<Uuid>,
    /// Comment text. Hidden from read models once soft-deleted.
    pub body: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Writes a new comment, as a reply to `parent` when given.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the body is blank or too long,
    /// or when `parent` is itself a reply or belongs to another post.
    pub fn post(
        id: Uuid,
        post_id: Uuid,
        author_id: Uuid,
        parent: Option<&Comment>,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DomainError::Validation("comment body must not be empty".to_owned()));
        }
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(DomainError::Validation(format!(
                "comment body must be at most {MAX_BODY_CHARS} characters"
            )));
        }
        if let Some(parent) = parent {
            if !parent.is_top_level() {
                return Err(DomainError::Validation(format!(
                    "comment {} is a reply; replies cannot be nested",
                    parent.id
                )));
            }
            if parent.post_id != post_id {
                return Err(DomainError::Validation(format!(
                    "comment {} belongs to another story",
                    parent.id
                )));
            }
        }

        Ok(Self {
            id,
            post_id,
            author_id,
            parent_comment_id: parent.map(|p| p.id),
            body: body.to_owned(),
            is_deleted: false,
            created_at: now,
        })
    }

    /// Returns `true` for comments that are not replies.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_comment_id.is_none()
    }
}
