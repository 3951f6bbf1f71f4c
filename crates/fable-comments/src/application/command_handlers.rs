//! Command handlers for the Comments context.

use fable_core::clock::{Clock, to_storage_precision};
use fable_core::command::Command;
use fable_core::error::DomainError;
use tracing::info;
use uuid::Uuid;

use crate::application::ports::CommentRepository;
use crate::domain::aggregates::Comment;
use crate::domain::commands::{DeleteComment, PostComment};

/// Handles the `PostComment` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the story or the parent
/// comment does not exist, `DomainError::Validation` for an invalid body or
/// an attempt to nest a reply under a reply, and propagates repository
/// failures.
pub async fn handle_post_comment(
    command: &PostComment,
    clock: &dyn Clock,
    repo: &dyn CommentRepository,
) -> Result<Comment, DomainError> {
    if !repo.post_exists(command.post_id).await? {
        return Err(DomainError::AggregateNotFound(command.post_id));
    }

    let parent = match command.parent_comment_id {
        Some(parent_id) => Some(
            repo.find_by_id(parent_id)
                .await?
                .ok_or(DomainError::AggregateNotFound(parent_id))?,
        ),
        None => None,
    };

    let comment = Comment::post(
        Uuid::new_v4(),
        command.post_id,
        command.author_id,
        parent.as_ref(),
        &command.body,
        to_storage_precision(clock.now()),
    )?;

    repo.insert(&comment).await?;

    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        comment_id = %comment.id,
        post_id = %comment.post_id,
        "comment posted"
    );
    Ok(comment)
}

/// Handles the `DeleteComment` command. Deleting an already deleted comment
/// is a no-op.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the comment does not exist.
pub async fn handle_delete_comment(
    command: &DeleteComment,
    clock: &dyn Clock,
    repo: &dyn CommentRepository,
) -> Result<(), DomainError> {
    let comment = repo
        .find_by_id(command.comment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.comment_id))?;

    if comment.is_deleted {
        return Ok(());
    }

    if !repo.soft_delete(comment.id, to_storage_precision(clock.now())).await? {
        return Err(DomainError::AggregateNotFound(comment.id));
    }

    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        comment_id = %comment.id,
        "comment deleted"
    );
    Ok(())
}
