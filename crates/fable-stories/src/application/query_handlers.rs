//! Query handlers for the Stories context.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fable_core::error::DomainError;
use fable_core::repository::AggregateRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Story, Visibility};

/// Read-only view of a story aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryView {
    /// The story identifier.
    pub story_id: Uuid,
    /// The author.
    pub created_by_id: Uuid,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Who may read the story.
    pub visibility: Visibility,
    /// Cover image, if any.
    pub cover_image_id: Option<Uuid>,
    /// Attached tags, in id order.
    pub tag_ids: BTreeSet<Uuid>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<Story> for StoryView {
    fn from(story: Story) -> Self {
        Self {
            story_id: story.id,
            created_by_id: story.created_by_id,
            name: story.name,
            description: story.description,
            visibility: story.visibility,
            cover_image_id: story.cover_image_id,
            tag_ids: story.tag_ids,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

/// Retrieves a story by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no story exists for the ID and
/// propagates repository failures.
pub async fn get_story_by_id(
    story_id: Uuid,
    repo: &dyn AggregateRepository<Story>,
) -> Result<StoryView, DomainError> {
    repo.find_by_id(story_id)
        .await?
        .map(StoryView::from)
        .ok_or(DomainError::AggregateNotFound(story_id))
}
