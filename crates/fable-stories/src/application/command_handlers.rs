//! Command handlers for the Stories context.
//!
//! Each handler runs inside one unit of work: load the aggregate for update,
//! apply the command in memory, persist under optimistic concurrency. A lost
//! race is reported to the caller as `DomainError::ConcurrencyConflict`; the
//! handlers never retry on their own.

use fable_core::clock::Clock;
use fable_core::command::Command;
use fable_core::error::DomainError;
use fable_core::repository::{AggregateRepository, ConflictSignal, WriteOutcome};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::aggregates::Story;
use crate::domain::commands::{CreateStory, DeleteStory, UpdateStory};

fn surface_conflict(command: &dyn Command, signal: ConflictSignal<Story>) -> DomainError {
    warn!(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        story_id = %signal.stale.id,
        "optimistic concurrency conflict"
    );
    DomainError::ConcurrencyConflict {
        aggregate_id: signal.stale.id,
        message: signal.message,
    }
}

/// Handles the `CreateStory` command: drafts a new aggregate and inserts it.
///
/// This is a creation command: the handler generates the story id.
///
/// # Errors
///
/// Returns `DomainError::Validation` for invalid content and propagates
/// repository failures.
pub async fn handle_create_story(
    command: &CreateStory,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<Story>,
) -> Result<Story, DomainError> {
    let story = Story::draft(
        Uuid::new_v4(),
        command.created_by_id,
        command.content.clone(),
        clock.now(),
    )?;

    let story = repo.insert(story).await?;

    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        story_id = %story.id,
        "story created"
    );
    Ok(story)
}

/// Handles the `UpdateStory` command: loads the aggregate for update, revises
/// it and persists the change.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the story does not exist,
/// `DomainError::ConcurrencyConflict` if another writer changed it since it
/// was loaded, and propagates validation and repository failures.
pub async fn handle_update_story(
    command: &UpdateStory,
    repo: &dyn AggregateRepository<Story>,
) -> Result<Story, DomainError> {
    let mut story = repo
        .load_for_update(command.story_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.story_id))?;

    story.revise(command.content.clone())?;

    match repo.update(story).await? {
        WriteOutcome::Written(story) => {
            info!(
                command = command.command_type(),
                correlation_id = %command.correlation_id,
                story_id = %story.id,
                "story updated"
            );
            Ok(story)
        }
        WriteOutcome::Conflict(signal) => Err(surface_conflict(command, signal)),
    }
}

/// Handles the `DeleteStory` command: loads the aggregate for update and
/// deletes it; links and comments go with it.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the story does not exist and
/// `DomainError::ConcurrencyConflict` if another writer changed it since it
/// was loaded.
pub async fn handle_delete_story(
    command: &DeleteStory,
    repo: &dyn AggregateRepository<Story>,
) -> Result<Story, DomainError> {
    let story = repo
        .load_for_update(command.story_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.story_id))?;

    match repo.delete(story).await? {
        WriteOutcome::Written(story) => {
            info!(
                command = command.command_type(),
                correlation_id = %command.correlation_id,
                story_id = %story.id,
                "story deleted"
            );
            Ok(story)
        }
        WriteOutcome::Conflict(signal) => Err(surface_conflict(command, signal)),
    }
}
