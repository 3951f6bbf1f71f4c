//! `PostgreSQL` implementation of `CommentThreadReader`.
//!
//! Listings are keyset-paginated on `(created_at, id)` and over-fetch one
//! row to detect whether another page exists. Reply previews for a whole
//! page of top-level comments come from a single window-function query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fable_comments::application::ports::CommentThreadReader;
use fable_comments::domain::read_models::{CommentRow, ReplyRow};
use fable_core::error::DomainError;
use fable_core::pagination::{Cursor, Page, PageRequest};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::reply_previews::{RankedReply, group_previews};
use crate::schema::{keyset_operator, order_keyword};

const TOP_LEVEL_SELECT: &str = r"
    SELECT
        c.id,
        c.post_id,
        c.author_id,
        CASE WHEN c.is_deleted THEN NULL ELSE c.body END AS body,
        c.is_deleted,
        c.created_at,
        (SELECT COUNT(*) FROM comments r WHERE r.parent_comment_id = c.id) AS reply_count
    FROM comments c
    WHERE c.parent_comment_id IS NULL AND c.post_id = ";

const REPLY_SELECT: &str = r"
    SELECT
        c.id,
        c.post_id,
        c.author_id,
        c.parent_comment_id,
        CASE WHEN c.is_deleted THEN NULL ELSE c.body END AS body,
        c.is_deleted,
        c.created_at
    FROM comments c
    WHERE c.parent_comment_id = ";

const RANKED_REPLIES: &str = r"
    SELECT id, post_id, author_id, parent_comment_id, body, is_deleted, created_at,
           reply_rank, reply_total
    FROM (
        SELECT
            c.id,
            c.post_id,
            c.author_id,
            c.parent_comment_id,
            CASE WHEN c.is_deleted THEN NULL ELSE c.body END AS body,
            c.is_deleted,
            c.created_at,
            ROW_NUMBER() OVER (
                PARTITION BY c.parent_comment_id ORDER BY c.created_at, c.id
            ) AS reply_rank,
            COUNT(*) OVER (PARTITION BY c.parent_comment_id) AS reply_total
        FROM comments c
        WHERE c.parent_comment_id = ANY($1)
    ) ranked
    WHERE reply_rank <= $2
    ORDER BY parent_comment_id, reply_rank
";

#[derive(Debug, sqlx::FromRow)]
struct TopLevelRecord {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    body: Option<String>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    reply_count: i64,
}

impl From<TopLevelRecord> for CommentRow {
    fn from(record: TopLevelRecord) -> Self {
        Self {
            id: record.id,
            post_id: record.post_id,
            author_id: record.author_id,
            body: record.body,
            is_deleted: record.is_deleted,
            created_at: record.created_at,
            reply_count: record.reply_count,
            has_replies: record.reply_count > 0,
            replies: Page::empty(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReplyRecord {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    parent_comment_id: Uuid,
    body: Option<String>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
}

impl From<ReplyRecord> for ReplyRow {
    fn from(record: ReplyRecord) -> Self {
        Self {
            id: record.id,
            post_id: record.post_id,
            author_id: record.author_id,
            parent_comment_id: record.parent_comment_id,
            body: record.body,
            is_deleted: record.is_deleted,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RankedReplyRecord {
    #[sqlx(flatten)]
    reply: ReplyRecord,
    reply_rank: i64,
    reply_total: i64,
}

impl From<RankedReplyRecord> for RankedReply {
    fn from(record: RankedReplyRecord) -> Self {
        Self {
            reply: record.reply.into(),
            rank: record.reply_rank,
            total: record.reply_total,
        }
    }
}

/// Appends the keyset predicate, ordering and over-fetching limit shared by
/// both listings.
fn push_page_clauses(
    query: &mut QueryBuilder<'_, Postgres>,
    cursor: Option<Cursor>,
    request: &PageRequest,
) {
    if let Some(cursor) = cursor {
        query
            .push(" AND (c.created_at, c.id) ")
            .push(keyset_operator(request.sort()))
            .push(" (")
            .push_bind(cursor.created_at())
            .push(", ")
            .push_bind(cursor.id())
            .push(")");
    }
    let order = order_keyword(request.sort());
    query
        .push(" ORDER BY c.created_at ")
        .push(order)
        .push(", c.id ")
        .push(order)
        .push(" LIMIT ")
        .push_bind(i64::from(request.limit()) + 1);
}

fn page_size(request: &PageRequest) -> usize {
    usize::try_from(request.limit()).unwrap_or(usize::MAX)
}

/// PostgreSQL-backed comment thread reader.
#[derive(Debug, Clone)]
pub struct PgCommentThreadReader {
    pool: PgPool,
}

impl PgCommentThreadReader {
    /// Creates a new `PgCommentThreadReader`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_previews(
        &self,
        parent_ids: &[Uuid],
        preview_limit: u32,
    ) -> Result<Vec<RankedReply>, DomainError> {
        let rows = sqlx::query_as::<_, RankedReplyRecord>(RANKED_REPLIES)
            .bind(parent_ids)
            .bind(i64::from(preview_limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::persistence("loading reply previews", e))?;
        Ok(rows.into_iter().map(RankedReply::from).collect())
    }

    async fn count(&self, sql: &str, id: Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::persistence(format!("counting comments for {id}"), e))
    }
}

#[async_trait]
impl CommentThreadReader for PgCommentThreadReader {
    #[instrument(skip(self, request), fields(limit = request.limit()))]
    async fn list_top_level(
        &self,
        post_id: Uuid,
        request: &PageRequest,
        preview_limit: u32,
    ) -> Result<Page<CommentRow>, DomainError> {
        let cursor = request.decode_cursor(None)?;

        let mut query = QueryBuilder::<Postgres>::new(TOP_LEVEL_SELECT);
        query.push_bind(post_id);
        push_page_clauses(&mut query, cursor, request);
        let records = query
            .build_query_as::<TopLevelRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::persistence(format!("listing comments of {post_id}"), e))?;

        let rows: Vec<CommentRow> = records.into_iter().map(CommentRow::from).collect();
        let mut page = Page::from_overfetch(rows, page_size(request), CommentRow::cursor);

        let parent_ids: Vec<Uuid> = page
            .items
            .iter()
            .filter(|row| row.has_replies)
            .map(|row| row.id)
            .collect();
        if preview_limit == 0 || parent_ids.is_empty() {
            return Ok(page);
        }

        let mut previews =
            group_previews(self.fetch_previews(&parent_ids, preview_limit).await?, preview_limit);
        for row in &mut page.items {
            if let Some(replies) = previews.remove(&row.id) {
                row.replies = replies;
            }
        }
        debug!(
            comments = page.items.len(),
            previewed = parent_ids.len(),
            "listed top-level comments"
        );
        Ok(page)
    }

    #[instrument(skip(self, request), fields(limit = request.limit()))]
    async fn list_replies(
        &self,
        parent_comment_id: Uuid,
        request: &PageRequest,
    ) -> Result<Page<ReplyRow>, DomainError> {
        let cursor = request.decode_cursor(Some(parent_comment_id))?;

        let mut query = QueryBuilder::<Postgres>::new(REPLY_SELECT);
        query.push_bind(parent_comment_id);
        push_page_clauses(&mut query, cursor, request);
        let records = query
            .build_query_as::<ReplyRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DomainError::persistence(format!("listing replies of {parent_comment_id}"), e)
            })?;

        let rows = records.into_iter().map(ReplyRow::from).collect();
        Ok(Page::from_overfetch(rows, page_size(request), ReplyRow::cursor))
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<i64, DomainError> {
        self.count("SELECT COUNT(*) FROM comments WHERE post_id = $1", post_id)
            .await
    }

    async fn count_replies(&self, parent_comment_id: Uuid) -> Result<i64, DomainError> {
        self.count(
            "SELECT COUNT(*) FROM comments WHERE parent_comment_id = $1",
            parent_comment_id,
        )
        .await
    }
}
