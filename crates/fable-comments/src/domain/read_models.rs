//! Read models served by the thread reader.
//!
//! Soft-deleted comments keep their place in a thread: every field except
//! `body` stays visible, and `body` is `None`.

use chrono::{DateTime, Utc};
use fable_core::pagination::{Cursor, Page};
use serde::Serialize;
use uuid::Uuid;

/// A direct reply to a top-level comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyRow {
    /// Reply identifier.
    pub id: Uuid,
    /// The story the thread belongs to.
    pub post_id: Uuid,
    /// The replier.
    pub author_id: Uuid,
    /// The top-level comment replied to.
    pub parent_comment_id: Uuid,
    /// Reply text; `None` once deleted.
    pub body: Option<String>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Creation time; with `id`, the keyset position.
    pub created_at: DateTime<Utc>,
}

impl ReplyRow {
    /// Keyset position of this reply within its parent's replies.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor::child_of(self.parent_comment_id, self.created_at, self.id)
    }
}

/// A top-level comment with live reply counts and a preview of its first
/// replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRow {
    /// Comment identifier.
    pub id: Uuid,
    /// The story commented on.
    pub post_id: Uuid,
    /// The commenter.
    pub author_id: Uuid,
    /// Comment text; `None` once deleted.
    pub body: Option<String>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Creation time; with `id`, the keyset position.
    pub created_at: DateTime<Utc>,
    /// Number of direct replies, counted from child rows at query time.
    pub reply_count: i64,
    /// `reply_count > 0`.
    pub has_replies: bool,
    /// The earliest replies, oldest first. `next_cursor` resumes
    /// `list_replies` for this comment and is `None` when the preview holds
    /// every reply.
    pub replies: Page<ReplyRow>,
}

impl CommentRow {
    /// Keyset position of this comment within its story's top-level comments.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor::top_level(self.created_at, self.id)
    }
}

/// Public identity of a comment author, owned by the identity context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    /// User identifier.
    pub id: Uuid,
    /// Name shown next to comments.
    pub display_name: String,
    /// Avatar image URL, if the user set one.
    pub avatar_url: Option<String>,
}
