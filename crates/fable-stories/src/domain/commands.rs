//! Commands for the Stories context.

use fable_core::command::Command;
use uuid::Uuid;

use super::aggregates::StoryContent;

/// Command to publish a new story.
#[derive(Debug, Clone)]
pub struct CreateStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The author of the story.
    pub created_by_id: Uuid,
    /// Initial content.
    pub content: StoryContent,
}

/// Command to replace a story's content.
#[derive(Debug, Clone)]
pub struct UpdateStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story to update.
    pub story_id: Uuid,
    /// Replacement content.
    pub content: StoryContent,
}

/// Command to delete a story together with its links and comments.
#[derive(Debug, Clone)]
pub struct DeleteStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story to delete.
    pub story_id: Uuid,
}

impl Command for CreateStory {
    fn command_type(&self) -> &'static str {
        "stories.create_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for UpdateStory {
    fn command_type(&self) -> &'static str {
        "stories.update_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_id(&self) -> Option<Uuid> {
        Some(self.story_id)
    }
}

impl Command for DeleteStory {
    fn command_type(&self) -> &'static str {
        "stories.delete_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_id(&self) -> Option<Uuid> {
        Some(self.story_id)
    }
}
