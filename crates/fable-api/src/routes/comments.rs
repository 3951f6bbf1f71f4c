//! Routes for the Comments bounded context.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use fable_comments::application::query_handlers::{self, CommentView, ReplyView};
use fable_comments::application::command_handlers;
use fable_comments::domain::commands;
use fable_core::pagination::{Page, PageRequest, SortDirection};

use crate::error::ApiError;
use crate::state::AppState;

/// Query string of the thread listings.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Page size; 20 when omitted.
    pub limit: Option<u32>,
    /// `asc` (default) or `desc`.
    #[serde(default)]
    pub sort: SortDirection,
    /// Continuation token from a previous page.
    pub cursor: Option<String>,
    /// Replies previewed per top-level comment; 3 when omitted.
    pub preview: Option<u32>,
}

impl ListParams {
    fn page_request(&self) -> Result<PageRequest, ApiError> {
        Ok(PageRequest::new(self.limit, self.sort, self.cursor.clone())?)
    }
}

/// Request body for POST /stories/{id}/comments.
#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    /// The commenting user.
    pub author_id: Uuid,
    /// The top-level comment to reply to, if any.
    #[serde(default)]
    pub parent_comment_id: Option<Uuid>,
    /// Comment text.
    pub body: String,
}

/// Response body after a comment is posted.
#[derive(Debug, Serialize)]
pub struct PostCommentResponse {
    /// The new comment's id.
    pub comment_id: Uuid,
    /// The story commented on.
    pub post_id: Uuid,
    /// The comment replied to, if any.
    pub parent_comment_id: Option<Uuid>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Response body of GET /stories/{id}/comments/count.
#[derive(Debug, Serialize)]
pub struct CommentCountResponse {
    /// The story counted.
    pub post_id: Uuid,
    /// Every comment on the story, replies and deleted comments included.
    pub count: i64,
}

/// GET /stories/{id}/comments
#[instrument(skip(state, params))]
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<CommentView>>, ApiError> {
    let request = params.page_request()?;
    let page = query_handlers::list_post_comments(
        post_id,
        &request,
        params.preview,
        state.threads.as_ref(),
        state.authors.as_ref(),
    )
    .await?;
    Ok(Json(page))
}

/// POST /stories/{id}/comments
#[instrument(skip(state, request), fields(author_id = %request.author_id))]
async fn post_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(request): Json<PostCommentRequest>,
) -> Result<(StatusCode, Json<PostCommentResponse>), ApiError> {
    let command = commands::PostComment {
        correlation_id: Uuid::new_v4(),
        post_id,
        author_id: request.author_id,
        parent_comment_id: request.parent_comment_id,
        body: request.body,
    };

    info!(correlation_id = %command.correlation_id, "handling post_comment command");

    let comment = command_handlers::handle_post_comment(
        &command,
        state.clock.as_ref(),
        state.comments.as_ref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(PostCommentResponse {
            comment_id: comment.id,
            post_id: comment.post_id,
            parent_comment_id: comment.parent_comment_id,
            created_at: comment.created_at,
        }),
    ))
}

/// GET /stories/{id}/comments/count
#[instrument(skip(state))]
async fn count_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<CommentCountResponse>, ApiError> {
    let count = query_handlers::count_post_comments(post_id, state.threads.as_ref()).await?;
    Ok(Json(CommentCountResponse { post_id, count }))
}

/// GET /comments/{id}/replies
#[instrument(skip(state, params))]
async fn list_replies(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<ReplyView>>, ApiError> {
    let request = params.page_request()?;
    let page = query_handlers::list_comment_replies(
        comment_id,
        &request,
        state.threads.as_ref(),
        state.authors.as_ref(),
    )
    .await?;
    Ok(Json(page))
}

/// DELETE /comments/{id}
#[instrument(skip(state))]
async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteComment {
        correlation_id: Uuid::new_v4(),
        comment_id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_comment command");

    command_handlers::handle_delete_comment(&command, state.clock.as_ref(), state.comments.as_ref())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for the comments context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories/{id}/comments", get(list_comments).post(post_comment))
        .route("/stories/{id}/comments/count", get(count_comments))
        .route("/comments/{id}/replies", get(list_replies))
        .route("/comments/{id}", delete(delete_comment))
}
