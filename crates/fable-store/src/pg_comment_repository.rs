//! `PostgreSQL` implementation of `CommentRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fable_comments::application::ports::CommentRepository;
use fable_comments::domain::aggregates::Comment;
use fable_core::error::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct CommentRecord {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    parent_comment_id: Option<Uuid>,
    body: String,
    is_deleted: bool,
    created_at: DateTime<Utc>,
}

impl From<CommentRecord> for Comment {
    fn from(record: CommentRecord) -> Self {
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

/// PostgreSQL-backed comment repository.
#[derive(Debug, Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    /// Creates a new `PgCommentRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn post_exists(&self, post_id: Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::persistence(format!("checking post {post_id}"), e))
    }

    async fn find_by_id(&self, comment_id: Uuid) -> Result<Option<Comment>, DomainError> {
        let record = sqlx::query_as::<_, CommentRecord>(
            r"
            SELECT id, post_id, author_id, parent_comment_id, body, is_deleted, created_at
            FROM comments
            WHERE id = $1
            ",
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::persistence(format!("loading comment {comment_id}"), e))?;
        Ok(record.map(Comment::from))
    }

    async fn insert(&self, comment: &Comment) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO comments
                (id, post_id, author_id, parent_comment_id, body, is_deleted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.parent_comment_id)
        .bind(&comment.body)
        .bind(comment.is_deleted)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::persistence(format!("inserting comment {}", comment.id), e))?;
        Ok(())
    }

    async fn soft_delete(&self, comment_id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            UPDATE comments
            SET is_deleted = TRUE, deleted_at = COALESCE(deleted_at, $2)
            WHERE id = $1
            ",
        )
        .bind(comment_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::persistence(format!("deleting comment {comment_id}"), e))?;
        Ok(result.rows_affected() > 0)
    }
}
