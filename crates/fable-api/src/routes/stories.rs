//! Routes for the Stories bounded context.

use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use fable_stories::application::{command_handlers, query_handlers};
use fable_stories::application::query_handlers::StoryView;
use fable_stories::domain::aggregates::{StoryContent, Visibility};
use fable_stories::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Author-editable story fields, shared by create and update bodies.
#[derive(Debug, Deserialize)]
pub struct StoryContentBody {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// `public`, `unlisted` or `private`.
    pub visibility: Visibility,
    /// Cover image to link, if any.
    #[serde(default)]
    pub cover_image_id: Option<Uuid>,
    /// Tags to link.
    #[serde(default)]
    pub tag_ids: BTreeSet<Uuid>,
}

impl From<StoryContentBody> for StoryContent {
    fn from(body: StoryContentBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            visibility: body.visibility,
            cover_image_id: body.cover_image_id,
            tag_ids: body.tag_ids,
        }
    }
}

/// Request body for POST /stories.
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    /// The authoring user.
    pub created_by_id: Uuid,
    /// Initial content.
    #[serde(flatten)]
    pub content: StoryContentBody,
}

/// POST /stories
#[instrument(skip(state, request), fields(created_by_id = %request.created_by_id))]
async fn create_story(
    State(state): State<AppState>,
    Json(request): Json<CreateStoryRequest>,
) -> Result<(StatusCode, Json<StoryView>), ApiError> {
    let command = commands::CreateStory {
        correlation_id: Uuid::new_v4(),
        created_by_id: request.created_by_id,
        content: request.content.into(),
    };

    info!(correlation_id = %command.correlation_id, "handling create_story command");

    let repo = state.stories.begin();
    let story =
        command_handlers::handle_create_story(&command, state.clock.as_ref(), repo.as_ref())
            .await?;

    Ok((StatusCode::CREATED, Json(story.into())))
}

/// GET /stories/{id}
#[instrument(skip(state))]
async fn get_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<StoryView>, ApiError> {
    let repo = state.stories.begin();
    let view = query_handlers::get_story_by_id(story_id, repo.as_ref()).await?;
    Ok(Json(view))
}

/// PUT /stories/{id}
#[instrument(skip(state, request))]
async fn update_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Json(request): Json<StoryContentBody>,
) -> Result<Json<StoryView>, ApiError> {
    let command = commands::UpdateStory {
        correlation_id: Uuid::new_v4(),
        story_id,
        content: request.into(),
    };

    info!(correlation_id = %command.correlation_id, "handling update_story command");

    let repo = state.stories.begin();
    let story = command_handlers::handle_update_story(&command, repo.as_ref()).await?;

    Ok(Json(story.into()))
}

/// DELETE /stories/{id}
#[instrument(skip(state))]
async fn delete_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteStory {
        correlation_id: Uuid::new_v4(),
        story_id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_story command");

    let repo = state.stories.begin();
    command_handlers::handle_delete_story(&command, repo.as_ref()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for the stories context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories", post(create_story))
        .route(
            "/stories/{id}",
            get(get_story).put(update_story).delete(delete_story),
        )
}
