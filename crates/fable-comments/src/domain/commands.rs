//! Commands for the Comments context.

use fable_core::command::Command;
use uuid::Uuid;

/// Command to comment on a story or reply to a top-level comment.
#[derive(Debug, Clone)]
pub struct PostComment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story being commented on.
    pub post_id: Uuid,
    /// The commenter.
    pub author_id: Uuid,
    /// The top-level comment being replied to, if any.
    pub parent_comment_id: Option<Uuid>,
    /// Comment text.
    pub body: String,
}

/// Command to soft-delete a comment. The row stays so threads keep their
/// shape; read models hide the body.
#[derive(Debug, Clone)]
pub struct DeleteComment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The comment to delete.
    pub comment_id: Uuid,
}

impl Command for PostComment {
    fn command_type(&self) -> &'static str {
        "comments.post_comment"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for DeleteComment {
    fn command_type(&self) -> &'static str {
        "comments.delete_comment"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_id(&self) -> Option<Uuid> {
        Some(self.comment_id)
    }
}
