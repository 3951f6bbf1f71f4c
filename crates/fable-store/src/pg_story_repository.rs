//! `PostgreSQL` implementation of `AggregateRepository<Story>`.
//!
//! A story spans four tables: the `posts` supertype row, the `stories`
//! subtype row and the `post_images` / `post_tags` link rows. Each write runs
//! in one transaction whose first statement is a compare-and-swap on
//! `posts.updated_at`; a miss rolls the transaction back and surfaces as a
//! conflict.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fable_core::clock::{Clock, to_storage_precision};
use fable_core::error::DomainError;
use fable_core::repository::{
    AggregateRepository, ConflictSignal, UnitOfWorkFactory, WriteOutcome,
};
use fable_core::watermark::WatermarkStore;
use fable_stories::domain::aggregates::{Story, Visibility};
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, Transaction};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::link_reconciler::reconcile_links;
use crate::post_rows;
use crate::schema::{COVER_IMAGE_ROLE, STORY_POST_KIND};

const SELECT_STORY: &str = r"
    SELECT
        p.id,
        p.created_by_id,
        p.created_at,
        p.updated_at,
        s.name,
        s.description,
        s.visibility,
        (SELECT pi.image_id FROM post_images pi
         WHERE pi.post_id = p.id AND pi.role = $2) AS cover_image_id,
        ARRAY(SELECT pt.tag_id FROM post_tags pt
              WHERE pt.post_id = p.id ORDER BY pt.tag_id) AS tag_ids
    FROM posts p
    JOIN stories s ON s.post_id = p.id
    WHERE p.id = $1
";

#[derive(Debug, sqlx::FromRow)]
struct StoryRecord {
    id: Uuid,
    created_by_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    name: String,
    description: String,
    visibility: String,
    cover_image_id: Option<Uuid>,
    tag_ids: Vec<Uuid>,
}

impl TryFrom<StoryRecord> for Story {
    type Error = DomainError;

    fn try_from(record: StoryRecord) -> Result<Self, Self::Error> {
        let visibility: Visibility = record.visibility.parse().map_err(|e| {
            DomainError::persistence(format!("decoding stories row {}", record.id), e)
        })?;
        Ok(Self {
            id: record.id,
            created_by_id: record.created_by_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            name: record.name,
            description: record.description,
            visibility,
            cover_image_id: record.cover_image_id,
            tag_ids: record.tag_ids.into_iter().collect::<BTreeSet<_>>(),
        })
    }
}

async fn fetch_story<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<Story>, DomainError> {
    sqlx::query_as::<_, StoryRecord>(SELECT_STORY)
        .bind(id)
        .bind(COVER_IMAGE_ROLE)
        .fetch_optional(executor)
        .await
        .map_err(|e| DomainError::persistence(format!("loading story {id}"), e))?
        .map(Story::try_from)
        .transpose()
}

/// Upserts the subtype row from the aggregate's current fields.
async fn write_story_row(conn: &mut PgConnection, story: &Story) -> Result<(), DomainError> {
    sqlx::query(
        r"
        INSERT INTO stories (post_id, name, description, visibility)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (post_id) DO UPDATE
        SET name = EXCLUDED.name,
            description = EXCLUDED.description,
            visibility = EXCLUDED.visibility
        ",
    )
    .bind(story.id)
    .bind(&story.name)
    .bind(&story.description)
    .bind(story.visibility.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::persistence(format!("writing stories row {}", story.id), e))?;
    Ok(())
}

/// PostgreSQL-backed story repository for one unit of work.
pub struct PgStoryRepository {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    watermarks: WatermarkStore,
}

impl PgStoryRepository {
    /// Creates a new `PgStoryRepository`.
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, watermarks: WatermarkStore) -> Self {
        Self {
            pool,
            clock,
            watermarks,
        }
    }

    /// Baselines recorded by `load_for_update` in this unit of work.
    #[must_use]
    pub fn watermarks(&self) -> &WatermarkStore {
        &self.watermarks
    }

    fn now(&self) -> DateTime<Utc> {
        to_storage_precision(self.clock.now())
    }

    fn baseline_of(&self, story: &Story) -> Result<DateTime<Utc>, DomainError> {
        self.watermarks
            .baseline(story.id)
            .ok_or(DomainError::MissingBaseline(story.id))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DomainError::persistence("starting transaction", e))
    }

    /// Re-reads the story inside the write transaction.
    async fn reload(conn: &mut PgConnection, id: Uuid) -> Result<Story, DomainError> {
        fetch_story(&mut *conn, id)
            .await?
            .ok_or(DomainError::NotFoundAfterWrite(id))
    }
}

impl fmt::Debug for PgStoryRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStoryRepository")
            .field("watermarks", &self.watermarks)
            .finish_non_exhaustive()
    }
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), DomainError> {
    tx.commit()
        .await
        .map_err(|e| DomainError::persistence("committing transaction", e))
}

#[async_trait]
impl AggregateRepository<Story> for PgStoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Story>, DomainError> {
        fetch_story(&self.pool, id).await
    }

    async fn load_for_update(&self, id: Uuid) -> Result<Option<Story>, DomainError> {
        let story = fetch_story(&self.pool, id).await?;
        if let Some(story) = &story {
            self.watermarks.record(story.id, story.updated_at);
        }
        Ok(story)
    }

    #[instrument(skip_all, fields(story_id = %story.id))]
    async fn insert(&self, story: Story) -> Result<Story, DomainError> {
        let now = self.now();
        let mut tx = self.begin().await?;

        post_rows::insert(&mut tx, story.id, STORY_POST_KIND, story.created_by_id, now).await?;
        write_story_row(&mut tx, &story).await?;
        reconcile_links(&mut tx, &story, now).await?;
        let stored = Self::reload(&mut tx, story.id).await?;

        commit(tx).await?;
        debug!(updated_at = %stored.updated_at, "story inserted");
        Ok(stored)
    }

    #[instrument(skip_all, fields(story_id = %story.id))]
    async fn update(&self, story: Story) -> Result<WriteOutcome<Story>, DomainError> {
        let baseline = self.baseline_of(&story)?;
        let now = self.now();
        let mut tx = self.begin().await?;

        let Some(updated_at) = post_rows::compare_and_touch(&mut tx, story.id, baseline, now).await?
        else {
            warn!(%baseline, "stale baseline, update rejected");
            return Ok(WriteOutcome::Conflict(ConflictSignal::stale_baseline(story)));
        };
        write_story_row(&mut tx, &story).await?;
        reconcile_links(&mut tx, &story, updated_at).await?;
        let stored = Self::reload(&mut tx, story.id).await?;

        commit(tx).await?;
        debug!(%updated_at, "story updated");
        Ok(WriteOutcome::Written(stored))
    }

    #[instrument(skip_all, fields(story_id = %story.id))]
    async fn delete(&self, story: Story) -> Result<WriteOutcome<Story>, DomainError> {
        let baseline = self.baseline_of(&story)?;
        let mut tx = self.begin().await?;

        if !post_rows::compare_and_delete(&mut tx, story.id, baseline).await? {
            warn!(%baseline, "stale baseline, delete rejected");
            return Ok(WriteOutcome::Conflict(ConflictSignal::stale_baseline(story)));
        }

        commit(tx).await?;
        debug!("story deleted");
        Ok(WriteOutcome::Written(story))
    }
}

/// Opens a [`PgStoryRepository`] with an empty watermark store per unit of
/// work.
#[derive(Clone)]
pub struct PgStoryRepositoryFactory {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgStoryRepositoryFactory {
    /// Creates a new `PgStoryRepositoryFactory`.
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

impl fmt::Debug for PgStoryRepositoryFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStoryRepositoryFactory")
            .finish_non_exhaustive()
    }
}

impl UnitOfWorkFactory<Story> for PgStoryRepositoryFactory {
    fn begin(&self) -> Box<dyn AggregateRepository<Story>> {
        Box::new(PgStoryRepository::new(
            self.pool.clone(),
            Arc::clone(&self.clock),
            WatermarkStore::new(),
        ))
    }
}
