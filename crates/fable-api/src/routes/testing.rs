//! Fakes and request helpers shared by the route unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use chrono::{DateTime, Utc};
use fable_comments::application::ports::{AuthorLookup, CommentRepository, CommentThreadReader};
use fable_comments::domain::aggregates::Comment;
use fable_comments::domain::read_models::{AuthorSummary, CommentRow, ReplyRow};
use fable_core::error::DomainError;
use fable_core::pagination::{Page, PageRequest};
use serde_json::Value;
use uuid::Uuid;

/// Comment ports with nothing behind them.
pub(crate) struct NoComments;

#[async_trait]
impl CommentRepository for NoComments {
    async fn post_exists(&self, _: Uuid) -> Result<bool, DomainError> {
        Ok(false)
    }

    async fn find_by_id(&self, _: Uuid) -> Result<Option<Comment>, DomainError> {
        Ok(None)
    }

    async fn insert(&self, _: &Comment) -> Result<(), DomainError> {
        Ok(())
    }

    async fn soft_delete(&self, _: Uuid, _: DateTime<Utc>) -> Result<bool, DomainError> {
        Ok(false)
    }
}

#[async_trait]
impl CommentThreadReader for NoComments {
    async fn list_top_level(
        &self,
        _: Uuid,
        _: &PageRequest,
        _: u32,
    ) -> Result<Page<CommentRow>, DomainError> {
        Ok(Page::empty())
    }

    async fn list_replies(&self, _: Uuid, _: &PageRequest) -> Result<Page<ReplyRow>, DomainError> {
        Ok(Page::empty())
    }

    async fn count_for_post(&self, _: Uuid) -> Result<i64, DomainError> {
        Ok(0)
    }

    async fn count_replies(&self, _: Uuid) -> Result<i64, DomainError> {
        Ok(0)
    }
}

#[async_trait]
impl AuthorLookup for NoComments {
    async fn find_authors(&self, _: &[Uuid]) -> Result<HashMap<Uuid, AuthorSummary>, DomainError> {
        Ok(HashMap::new())
    }
}

/// Comment writes kept in memory, for a known set of posts.
#[derive(Debug, Default)]
pub(crate) struct MemoryComments {
    posts: HashSet<Uuid>,
    comments: Mutex<HashMap<Uuid, Comment>>,
}

impl MemoryComments {
    pub(crate) fn with_post(post_id: Uuid) -> Self {
        Self {
            posts: HashSet::from([post_id]),
            comments: Mutex::default(),
        }
    }

    pub(crate) fn seed(&self, comment: &Comment) {
        self.comments
            .lock()
            .unwrap()
            .insert(comment.id, comment.clone());
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<Comment> {
        self.comments.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl CommentRepository for MemoryComments {
    async fn post_exists(&self, post_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.posts.contains(&post_id))
    }

    async fn find_by_id(&self, comment_id: Uuid) -> Result<Option<Comment>, DomainError> {
        Ok(self.get(comment_id))
    }

    async fn insert(&self, comment: &Comment) -> Result<(), DomainError> {
        self.seed(comment);
        Ok(())
    }

    async fn soft_delete(&self, comment_id: Uuid, _: DateTime<Utc>) -> Result<bool, DomainError> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get_mut(&comment_id)
            .map(|comment| comment.is_deleted = true)
            .is_some())
    }
}

pub(crate) fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub(crate) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub(crate) async fn body_json(response: Response) -> Value {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}
