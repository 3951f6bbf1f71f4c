//! Query handlers for the Comments context.
//!
//! Thread listings come from the `CommentThreadReader`; author identities are
//! attached afterwards with a single batched `AuthorLookup` call per page.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use fable_core::error::DomainError;
use fable_core::pagination::{Page, PageRequest};
use serde::Serialize;
use uuid::Uuid;

use crate::application::ports::{AuthorLookup, CommentThreadReader};
use crate::domain::read_models::{AuthorSummary, CommentRow, ReplyRow};

/// Replies shown under each top-level comment when the caller does not ask
/// for a specific number.
pub const DEFAULT_REPLY_PREVIEW_LIMIT: u32 = 3;

/// Largest reply preview a caller may request.
pub const MAX_REPLY_PREVIEW_LIMIT: u32 = 20;

/// A reply as returned to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyView {
    /// Reply identifier.
    pub comment_id: Uuid,
    /// The top-level comment replied to.
    pub parent_comment_id: Uuid,
    /// The replier.
    pub author_id: Uuid,
    /// The replier's public identity, when known.
    pub author: Option<AuthorSummary>,
    /// Reply text; `None` once deleted.
    pub body: Option<String>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A top-level comment as returned to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    /// Comment identifier.
    pub comment_id: Uuid,
    /// The story commented on.
    pub post_id: Uuid,
    /// The commenter.
    pub author_id: Uuid,
    /// The commenter's public identity, when known.
    pub author: Option<AuthorSummary>,
    /// Comment text; `None` once deleted.
    pub body: Option<String>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Number of direct replies.
    pub reply_count: i64,
    /// Whether the comment has replies.
    pub has_replies: bool,
    /// The earliest replies and a cursor to continue with.
    pub replies: Page<ReplyView>,
}

fn reply_view(row: ReplyRow, authors: &HashMap<Uuid, AuthorSummary>) -> ReplyView {
    ReplyView {
        comment_id: row.id,
        parent_comment_id: row.parent_comment_id,
        author_id: row.author_id,
        author: authors.get(&row.author_id).cloned(),
        body: row.body,
        is_deleted: row.is_deleted,
        created_at: row.created_at,
    }
}

fn comment_view(row: CommentRow, authors: &HashMap<Uuid, AuthorSummary>) -> CommentView {
    CommentView {
        comment_id: row.id,
        post_id: row.post_id,
        author_id: row.author_id,
        author: authors.get(&row.author_id).cloned(),
        body: row.body,
        is_deleted: row.is_deleted,
        created_at: row.created_at,
        reply_count: row.reply_count,
        has_replies: row.has_replies,
        replies: row.replies.map(|reply| reply_view(reply, authors)),
    }
}

async fn resolve_authors(
    author_ids: BTreeSet<Uuid>,
    lookup: &dyn AuthorLookup,
) -> Result<HashMap<Uuid, AuthorSummary>, DomainError> {
    if author_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<Uuid> = author_ids.into_iter().collect();
    lookup.find_authors(&ids).await
}

/// Lists a story's top-level comments with reply previews and authors.
///
/// # Errors
///
/// Returns `DomainError::Validation` when `preview_limit` exceeds
/// `MAX_REPLY_PREVIEW_LIMIT`, `DomainError::InvalidCursor` for a bad cursor,
/// and propagates storage failures.
pub async fn list_post_comments(
    post_id: Uuid,
    request: &PageRequest,
    preview_limit: Option<u32>,
    reader: &dyn CommentThreadReader,
    authors: &dyn AuthorLookup,
) -> Result<Page<CommentView>, DomainError> {
    let preview_limit = preview_limit.unwrap_or(DEFAULT_REPLY_PREVIEW_LIMIT);
    if preview_limit > MAX_REPLY_PREVIEW_LIMIT {
        return Err(DomainError::Validation(format!(
            "reply preview limit must be at most {MAX_REPLY_PREVIEW_LIMIT}, got {preview_limit}"
        )));
    }

    let page = reader.list_top_level(post_id, request, preview_limit).await?;

    let author_ids = page
        .items
        .iter()
        .flat_map(|row| {
            std::iter::once(row.author_id).chain(row.replies.items.iter().map(|r| r.author_id))
        })
        .collect();
    let known = resolve_authors(author_ids, authors).await?;

    Ok(page.map(|row| comment_view(row, &known)))
}

/// Lists the replies of one top-level comment with authors.
///
/// # Errors
///
/// Returns `DomainError::InvalidCursor` for a bad cursor and propagates
/// storage failures.
pub async fn list_comment_replies(
    parent_comment_id: Uuid,
    request: &PageRequest,
    reader: &dyn CommentThreadReader,
    authors: &dyn AuthorLookup,
) -> Result<Page<ReplyView>, DomainError> {
    let page = reader.list_replies(parent_comment_id, request).await?;

    let author_ids = page.items.iter().map(|r| r.author_id).collect();
    let known = resolve_authors(author_ids, authors).await?;

    Ok(page.map(|row| reply_view(row, &known)))
}

/// Counts every comment on a story, replies included.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn count_post_comments(
    post_id: Uuid,
    reader: &dyn CommentThreadReader,
) -> Result<i64, DomainError> {
    reader.count_for_post(post_id).await
}
