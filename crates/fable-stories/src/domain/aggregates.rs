//! Aggregate roots for the Stories context.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fable_core::aggregate::AggregateRoot;
use fable_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest story name accepted, in characters.
pub const MAX_NAME_CHARS: usize = 200;

/// Longest story description accepted, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 10_000;

/// Who may read a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed and readable by everyone.
    Public,
    /// Readable by anyone with the link, never listed.
    Unlisted,
    /// Readable by the author only.
    Private,
}

impl Visibility {
    /// The storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            "private" => Ok(Self::Private),
            other => Err(DomainError::Validation(format!("unknown visibility: {other}"))),
        }
    }
}

/// The author-editable part of a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryContent {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Who may read the story.
    pub visibility: Visibility,
    /// Image shown as the story's cover, owned by the media service.
    pub cover_image_id: Option<Uuid>,
    /// Tags attached to the story.
    pub tag_ids: BTreeSet<Uuid>,
}

impl StoryContent {
    fn validated(mut self) -> Result<Self, DomainError> {
        self.name = self.name.trim().to_owned();
        if self.name.is_empty() {
            return Err(DomainError::Validation("story name must not be empty".to_owned()));
        }
        if self.name.chars().count() > MAX_NAME_CHARS {
            return Err(DomainError::Validation(format!(
                "story name must be at most {MAX_NAME_CHARS} characters"
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(DomainError::Validation(format!(
                "story description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        Ok(self)
    }
}

/// The aggregate root for a story.
///
/// Persisted as a `posts` supertype row, a `stories` subtype row and the
/// `post_images` / `post_tags` link rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    /// Aggregate identifier, shared by the supertype and subtype rows.
    pub id: Uuid,
    /// The user who created the story.
    pub created_by_id: Uuid,
    /// Set by storage on insert.
    pub created_at: DateTime<Utc>,
    /// Set by storage on every write; the optimistic-concurrency token.
    pub updated_at: DateTime<Utc>,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Who may read the story.
    pub visibility: Visibility,
    /// Cover image link, if any.
    pub cover_image_id: Option<Uuid>,
    /// Tag links.
    pub tag_ids: BTreeSet<Uuid>,
}

impl Story {
    /// Creates a new, not yet persisted story.
    ///
    /// `now` is provisional: storage assigns the real timestamps on insert.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the content is invalid.
    pub fn draft(
        id: Uuid,
        created_by_id: Uuid,
        content: StoryContent,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let content = content.validated()?;
        Ok(Self {
            id,
            created_by_id,
            created_at: now,
            updated_at: now,
            name: content.name,
            description: content.description,
            visibility: content.visibility,
            cover_image_id: content.cover_image_id,
            tag_ids: content.tag_ids,
        })
    }

    /// Replaces the author-editable content.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the content is invalid; the story
    /// is left unchanged.
    pub fn revise(&mut self, content: StoryContent) -> Result<(), DomainError> {
        let content = content.validated()?;
        self.name = content.name;
        self.description = content.description;
        self.visibility = content.visibility;
        self.cover_image_id = content.cover_image_id;
        self.tag_ids = content.tag_ids;
        Ok(())
    }
}

impl AggregateRoot for Story {
    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn stamp(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }
}
